// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::config::duration::parse_duration;
use crate::errors::{ProviderHostError, Result};

/// Top-level project file as read from TOML.
///
/// ```toml
/// name = "shop"
///
/// [config]
/// desktop_integration = true
/// context = "default"
///
/// [service.db.provider]
/// type = "model"
/// options = { model = "ai/smollm2" }
///
/// [service.web]
/// depends_on = ["db"]
/// environment = { PORT = "8080" }
/// ```
///
/// All sections are optional; validation happens when converting into a
/// [`ProjectFile`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawProjectFile {
    /// Project name passed to plugins as `--project-name`.
    ///
    /// When omitted the loader derives it from the project directory.
    #[serde(default)]
    pub name: Option<String>,

    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All services from `[service.<name>]`.
    #[serde(default)]
    pub service: BTreeMap<String, ServiceConfig>,
}

/// Validated project.
///
/// This is the configuration graph the orchestrator mutates: after a
/// successful `up`, dependents of a provider service gain the variables the
/// plugin reported.
#[derive(Debug, Clone)]
pub struct ProjectFile {
    pub name: String,
    pub config: ConfigSection,
    pub service: BTreeMap<String, ServiceConfig>,
}

impl ProjectFile {
    /// Construct without validation. Only used after [`TryFrom`] has checked
    /// the raw file.
    pub(crate) fn new_unchecked(
        name: String,
        config: ConfigSection,
        service: BTreeMap<String, ServiceConfig>,
    ) -> Self {
        Self {
            name,
            config,
            service,
        }
    }

    pub fn service(&self, name: &str) -> Result<&ServiceConfig> {
        self.service
            .get(name)
            .ok_or_else(|| ProviderHostError::ServiceNotFound(name.to_string()))
    }

    /// Names of services backed by a provider plugin.
    pub fn provider_services(&self) -> impl Iterator<Item = &str> {
        self.service
            .iter()
            .filter(|(_, svc)| svc.provider.is_some())
            .map(|(name, _)| name.as_str())
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Extra directories searched for `docker-<type>` plugin executables,
    /// ahead of the standard CLI plugin locations.
    #[serde(default)]
    pub plugin_dirs: Vec<PathBuf>,

    /// Whether provider plugins are allowed to run at all.
    #[serde(default = "default_desktop_integration")]
    pub desktop_integration: bool,

    /// Value exported to plugins as `DOCKER_CONTEXT`.
    #[serde(default = "default_context")]
    pub context: String,

    /// How long a cancelled plugin may take to exit after being signalled
    /// before it is killed, e.g. `"10s"` or `"500ms"`.
    #[serde(default = "default_cancel_grace")]
    pub cancel_grace: String,
}

fn default_desktop_integration() -> bool {
    true
}

fn default_context() -> String {
    "default".to_string()
}

fn default_cancel_grace() -> String {
    "10s".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            plugin_dirs: Vec::new(),
            desktop_integration: default_desktop_integration(),
            context: default_context(),
            cancel_grace: default_cancel_grace(),
        }
    }
}

impl ConfigSection {
    /// Parsed `cancel_grace`; validated on load so this only falls back for
    /// hand-built sections.
    pub fn cancel_grace(&self) -> Duration {
        parse_duration(&self.cancel_grace).unwrap_or(Duration::from_secs(10))
    }
}

/// `[service.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    /// Set when the service's lifecycle is delegated to a plugin.
    #[serde(default)]
    pub provider: Option<ProviderConfig>,

    /// Services this one depends on.
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Environment passed to the service.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

impl ServiceConfig {
    pub fn depends_on(&self, service: &str) -> bool {
        self.depends_on.iter().any(|dep| dep == service)
    }
}

/// `[service.<name>.provider]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    /// Provider type, e.g. `"model"`; resolves to a `docker-<type>` plugin.
    #[serde(rename = "type")]
    pub kind: String,

    /// Free-form options, each passed to the plugin as `--<key>=<value>`.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}
