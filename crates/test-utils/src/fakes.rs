#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use provider_host::errors::{ProviderHostError, Result};
use provider_host::plugin::{IntegrationGate, Plugin, PluginResolver};
use provider_host::progress::{ProgressEvent, ProgressSink};

/// A progress sink that records every event it receives.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// A resolver backed by a fixed provider-type → path table.
#[derive(Clone, Default)]
pub struct StaticResolver {
    plugins: HashMap<String, PathBuf>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin(mut self, provider_type: &str, path: impl Into<PathBuf>) -> Self {
        self.plugins.insert(provider_type.to_string(), path.into());
        self
    }

    /// Provider types that were looked up, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl PluginResolver for StaticResolver {
    fn resolve(&self, provider_type: &str) -> Result<Plugin> {
        self.calls.lock().unwrap().push(provider_type.to_string());
        self.plugins
            .get(provider_type)
            .map(|path| Plugin {
                name: provider_type.to_string(),
                path: path.clone(),
            })
            .ok_or_else(|| {
                ProviderHostError::Resolution(format!(
                    "provider plugin {provider_type:?} not found"
                ))
            })
    }
}

/// A gate with fixed answers.
#[derive(Clone)]
pub struct StaticGate {
    enabled: bool,
    not_ready: Option<String>,
}

impl StaticGate {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            not_ready: None,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            not_ready: None,
        }
    }

    /// Enabled, but every provider fails its readiness check with `reason`.
    pub fn not_ready(reason: &str) -> Self {
        Self {
            enabled: true,
            not_ready: Some(reason.to_string()),
        }
    }
}

impl IntegrationGate for StaticGate {
    fn is_integration_enabled(&self) -> bool {
        self.enabled
    }

    fn check_provider_ready<'a>(
        &'a self,
        _plugin: &'a Plugin,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        let answer = match &self.not_ready {
            Some(reason) => Err(ProviderHostError::Gate(reason.clone())),
            None => Ok(()),
        };
        Box::pin(async move { answer })
    }
}

/// Write an executable `docker-<provider_type>` shell script into `dir`.
///
/// `body` is the script after the shebang line.
#[cfg(unix)]
pub fn write_plugin_script(dir: &Path, provider_type: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(format!("docker-{provider_type}"));
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
