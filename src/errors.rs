// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderHostError {
    /// No executable is registered for the provider type.
    #[error("{0}")]
    Resolution(String),

    /// Integration disabled, provider not ready, or provider kind unsupported.
    #[error("{0}")]
    Gate(String),

    /// The plugin process could not be spawned or its stdout acquired.
    #[error("failed to launch provider plugin: {0}")]
    Launch(String),

    /// Malformed message, unknown message type or bad `setenv` payload.
    #[error("invalid response from plugin: {0}")]
    Protocol(String),

    /// The plugin sent an explicit `error` message.
    #[error("{0}")]
    PluginReported(String),

    /// The plugin exited non-zero, was cancelled, or could not be waited on.
    #[error("failed to {action} external service: {detail}")]
    Exit { action: &'static str, detail: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Cycle detected in service dependencies: {0}")]
    DagCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ProviderHostError>;
