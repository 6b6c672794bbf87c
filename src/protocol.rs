// src/protocol.rs

//! Wire protocol spoken by provider plugins on stdout.
//!
//! Each line carries one JSON object:
//!
//! ```text
//! {"type": "info",   "message": "pulling image"}
//! {"type": "setenv", "message": "URL=http://localhost:12434"}
//! {"type": "error",  "message": "model runner is not running"}
//! ```
//!
//! Lines are first decoded into a loose [`RawMessage`] and then converted into
//! the closed [`PluginMessage`] enum, so that an unknown `type` can be reported
//! with the offending value rather than a generic serde error.

use serde::{Deserialize, Serialize};

use crate::errors::{ProviderHostError, Result};

pub const ERROR_TYPE: &str = "error";
pub const INFO_TYPE: &str = "info";
pub const SET_ENV_TYPE: &str = "setenv";

/// A message exactly as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(rename = "type")]
    pub kind: String,
    /// Absent and `null` both read as an empty message.
    #[serde(default)]
    pub message: Option<String>,
}

/// A validated plugin message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginMessage {
    /// The plugin failed; the text is shown to the user as-is.
    Error(String),
    /// Human-readable status update.
    Info(String),
    /// A variable to expose to dependent services.
    SetEnv { key: String, value: String },
}

impl TryFrom<RawMessage> for PluginMessage {
    type Error = ProviderHostError;

    fn try_from(raw: RawMessage) -> std::result::Result<Self, ProviderHostError> {
        let message = raw.message.unwrap_or_default();
        match raw.kind.as_str() {
            ERROR_TYPE => Ok(PluginMessage::Error(message)),
            INFO_TYPE => Ok(PluginMessage::Info(message)),
            SET_ENV_TYPE => {
                let (key, value) = message
                    .split_once('=')
                    .ok_or_else(|| ProviderHostError::Protocol(message.clone()))?;
                Ok(PluginMessage::SetEnv {
                    key: key.to_string(),
                    value: value.to_string(),
                })
            }
            _ => Err(ProviderHostError::Protocol(raw.kind)),
        }
    }
}

/// Decode a single line of plugin output.
///
/// Returns `Ok(None)` for blank lines.
pub fn decode_line(line: &str) -> Result<Option<PluginMessage>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let raw: RawMessage = serde_json::from_str(line)
        .map_err(|e| ProviderHostError::Protocol(format!("{e}: {line}")))?;

    PluginMessage::try_from(raw).map(Some)
}
