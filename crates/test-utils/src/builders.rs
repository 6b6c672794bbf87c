#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use provider_host::config::{ConfigSection, ProjectFile, ProviderConfig, RawProjectFile, ServiceConfig};

/// Builder for `ProjectFile` to simplify test setup.
pub struct ProjectBuilder {
    project: RawProjectFile,
}

impl ProjectBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            project: RawProjectFile {
                name: Some(name.to_string()),
                config: ConfigSection::default(),
                service: BTreeMap::new(),
            },
        }
    }

    pub fn with_service(mut self, name: &str, service: ServiceConfig) -> Self {
        self.project.service.insert(name.to_string(), service);
        self
    }

    pub fn with_plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project.config.plugin_dirs.push(dir.into());
        self
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.project.config.context = context.to_string();
        self
    }

    pub fn with_desktop_integration(mut self, enabled: bool) -> Self {
        self.project.config.desktop_integration = enabled;
        self
    }

    pub fn build(self) -> ProjectFile {
        ProjectFile::try_from(self.project).expect("Failed to build valid project from builder")
    }
}

/// Builder for `ServiceConfig`.
pub struct ServiceBuilder {
    service: ServiceConfig,
}

impl ServiceBuilder {
    pub fn new() -> Self {
        Self {
            service: ServiceConfig::default(),
        }
    }

    /// A service whose lifecycle is delegated to the `kind` provider.
    pub fn provider(kind: &str) -> Self {
        Self {
            service: ServiceConfig {
                provider: Some(ProviderConfig {
                    kind: kind.to_string(),
                    options: BTreeMap::new(),
                }),
                ..ServiceConfig::default()
            },
        }
    }

    pub fn option(mut self, key: &str, value: &str) -> Self {
        if let Some(provider) = self.service.provider.as_mut() {
            provider.options.insert(key.to_string(), value.to_string());
        }
        self
    }

    pub fn depends_on(mut self, dep: &str) -> Self {
        self.service.depends_on.push(dep.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.service
            .environment
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> ServiceConfig {
        self.service
    }
}

impl Default for ServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
