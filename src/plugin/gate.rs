// src/plugin/gate.rs

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::errors::{ProviderHostError, Result};
use crate::plugin::resolver::Plugin;

/// Provider kind with a known readiness check; every other kind is rejected.
pub const MODEL_PROVIDER: &str = "model";

/// Decides whether provider plugins may run.
pub trait IntegrationGate: Send + Sync {
    /// Whether the integration that hosts provider plugins is active.
    fn is_integration_enabled(&self) -> bool;

    /// Provider-specific readiness check.
    fn check_provider_ready<'a>(
        &'a self,
        plugin: &'a Plugin,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Run both gate checks for a plugin.
pub async fn check_plugin_enabled(gate: &dyn IntegrationGate, plugin: &Plugin) -> Result<()> {
    if !gate.is_integration_enabled() {
        return Err(ProviderHostError::Gate(format!(
            "you should enable Docker Desktop integration to use {:?} provider services",
            plugin.name
        )));
    }
    gate.check_provider_ready(plugin).await
}

/// Gate backed by the `[config].desktop_integration` switch and, for the
/// `model` provider, the model runner status command.
#[derive(Debug, Clone)]
pub struct DesktopGate {
    enabled: bool,
    model_status: Vec<String>,
}

impl DesktopGate {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            model_status: vec!["docker".into(), "model".into(), "status".into()],
        }
    }

    /// Override the readiness probe for the `model` provider.
    pub fn with_model_status_command(mut self, argv: Vec<String>) -> Self {
        self.model_status = argv;
        self
    }

    async fn check_model_runner(&self, plugin: &Plugin) -> Result<()> {
        let Some((program, args)) = self.model_status.split_first() else {
            return Ok(());
        };

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            // Only an explicit "not running" answer blocks the provider;
            // a missing or broken probe is left to the plugin to report.
            Ok(out) if out.status.code() == Some(1) => Err(ProviderHostError::Gate(format!(
                "you should enable model runner to use {:?} provider services: {}",
                plugin.name, out.status
            ))),
            Ok(out) => {
                debug!(provider = %plugin.name, status = %out.status, "model runner status checked");
                Ok(())
            }
            Err(e) => {
                debug!(provider = %plugin.name, error = %e, "model runner status probe failed; ignoring");
                Ok(())
            }
        }
    }
}

impl IntegrationGate for DesktopGate {
    fn is_integration_enabled(&self) -> bool {
        self.enabled
    }

    fn check_provider_ready<'a>(
        &'a self,
        plugin: &'a Plugin,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if plugin.name == MODEL_PROVIDER {
                self.check_model_runner(plugin).await
            } else {
                Err(ProviderHostError::Gate(format!(
                    "unsupported provider {:?}",
                    plugin.name
                )))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn plugin(name: &str) -> Plugin {
        Plugin {
            name: name.to_string(),
            path: PathBuf::from("/bin/true"),
        }
    }

    #[tokio::test]
    async fn disabled_integration_is_rejected() {
        let gate = DesktopGate::new(false);
        let err = check_plugin_enabled(&gate, &plugin("model")).await.unwrap_err();
        assert!(matches!(err, ProviderHostError::Gate(_)));
        assert!(err.to_string().contains("Docker Desktop integration"));
        assert!(err.to_string().contains("\"model\""));
    }

    #[tokio::test]
    async fn unsupported_provider_is_rejected() {
        let gate = DesktopGate::new(true).with_model_status_command(vec![]);
        let err = check_plugin_enabled(&gate, &plugin("redis")).await.unwrap_err();
        assert_eq!(err.to_string(), "unsupported provider \"redis\"");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn model_runner_exit_code_one_blocks() {
        let gate = DesktopGate::new(true)
            .with_model_status_command(vec!["sh".into(), "-c".into(), "exit 1".into()]);
        let err = check_plugin_enabled(&gate, &plugin("model")).await.unwrap_err();
        assert!(err.to_string().contains("enable model runner"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn other_probe_failures_are_ignored() {
        let gate = DesktopGate::new(true)
            .with_model_status_command(vec!["sh".into(), "-c".into(), "exit 2".into()]);
        check_plugin_enabled(&gate, &plugin("model")).await.unwrap();

        let gate = DesktopGate::new(true)
            .with_model_status_command(vec!["/nonexistent/probe".into()]);
        check_plugin_enabled(&gate, &plugin("model")).await.unwrap();
    }
}
