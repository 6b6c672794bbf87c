// src/orchestrator.rs

//! Provider invocation: resolve the plugin, check it may run, launch it,
//! decode its output and fold the reported variables into the project.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::ChildStdout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::model::ProjectFile;
use crate::errors::{ProviderHostError, Result};
use crate::exec::command::{CONTEXT_ENV_VAR, InvocationCommand, SOCKET_ENV_VAR};
use crate::exec::decoder::execute_plugin;
use crate::exec::process::{PluginProcess, WaitHandle};
use crate::plugin::gate::{DesktopGate, IntegrationGate, check_plugin_enabled};
use crate::plugin::relay::{CancelHook, SignalRelay, SocketRelay};
use crate::plugin::resolver::{CliPluginResolver, PluginResolver};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::types::{Operation, ResultVariables};

/// Trace context variables forwarded to plugins when set.
pub const TRACE_CARRIER_VARS: [&str; 3] = ["TRACEPARENT", "TRACESTATE", "BAGGAGE"];

/// Per-call context: cancellation of the parent operation and the trace
/// context to hand to the plugin.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    pub cancel: CancellationToken,
    pub trace_carrier: BTreeMap<String, String>,
}

impl InvocationContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            trace_carrier: BTreeMap::new(),
        }
    }

    pub fn with_trace_carrier(mut self, carrier: BTreeMap<String, String>) -> Self {
        self.trace_carrier = carrier;
        self
    }

    /// Carrier made of the trace variables present in this process's
    /// environment.
    pub fn carrier_from_env() -> BTreeMap<String, String> {
        TRACE_CARRIER_VARS
            .iter()
            .filter_map(|key| Some((key.to_string(), std::env::var(key).ok()?)))
            .collect()
    }
}

/// Runs provider plugins for the services of a project.
pub struct ProviderRunner {
    resolver: Arc<dyn PluginResolver>,
    gate: Arc<dyn IntegrationGate>,
    relay: Option<Arc<dyn SignalRelay>>,
    sink: Arc<dyn ProgressSink>,
    context: String,
    cancel_grace: Duration,
}

/// A spawned plugin, ready to be decoded.
struct Launched {
    output: ChildStdout,
    wait: WaitHandle,
}

impl ProviderRunner {
    pub fn new(
        resolver: Arc<dyn PluginResolver>,
        gate: Arc<dyn IntegrationGate>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            resolver,
            gate,
            relay: None,
            sink,
            context: "default".to_string(),
            cancel_grace: Duration::from_secs(10),
        }
    }

    /// Production wiring from the project's `[config]` section.
    pub fn from_project(project: &ProjectFile, sink: Arc<dyn ProgressSink>) -> Self {
        let cfg = &project.config;
        Self::new(
            Arc::new(CliPluginResolver::with_default_dirs(cfg.plugin_dirs.clone())),
            Arc::new(DesktopGate::new(cfg.desktop_integration)),
            sink,
        )
        .with_relay(Arc::new(SocketRelay))
        .with_context(cfg.context.clone())
        .with_cancel_grace(cfg.cancel_grace())
    }

    pub fn with_relay(mut self, relay: Arc<dyn SignalRelay>) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace = grace;
        self
    }

    /// Resolve the plugin and build its command without running anything.
    ///
    /// The command carries neither a cancellation hook nor trace context.
    pub fn plan(
        &self,
        project: &ProjectFile,
        service: &str,
        op: Operation,
    ) -> Result<InvocationCommand> {
        let provider = project
            .service(service)?
            .provider
            .as_ref()
            .ok_or_else(|| not_a_provider(service))?;
        let plugin = self.resolver.resolve(&provider.kind)?;

        let mut cmd = InvocationCommand::for_provider(&plugin.path, &project.name, provider, op);
        cmd.push_env(CONTEXT_ENV_VAR, self.context.as_str());
        Ok(cmd)
    }

    /// Run the provider plugin of `service` for `op`.
    ///
    /// On success every service that depends on `service` gains the reported
    /// variables, prefixed with the upper-cased service name and `_`, and the
    /// variables are returned. On failure the project is left untouched and
    /// an error event has been reported.
    pub async fn run_provider(
        &self,
        ctx: &InvocationContext,
        project: &mut ProjectFile,
        service: &str,
        op: Operation,
    ) -> Result<ResultVariables> {
        let launched = match self.launch(ctx, project, service, op).await {
            Ok(launched) => launched,
            Err(err) => {
                self.sink.event(ProgressEvent::Error {
                    service: service.to_string(),
                    message: err.to_string(),
                });
                return Err(err);
            }
        };

        let variables = execute_plugin(
            launched.output,
            launched.wait,
            service,
            op,
            self.sink.as_ref(),
            &ctx.cancel,
        )
        .await?;

        let updated = propagate_variables(project, service, &variables);
        info!(
            service = %service,
            operation = %op,
            variables = variables.len(),
            dependents = ?updated,
            "provider invocation complete"
        );

        Ok(variables)
    }

    async fn launch(
        &self,
        ctx: &InvocationContext,
        project: &ProjectFile,
        service: &str,
        op: Operation,
    ) -> Result<Launched> {
        let provider = project
            .service(service)?
            .provider
            .as_ref()
            .ok_or_else(|| not_a_provider(service))?;

        let plugin = self.resolver.resolve(&provider.kind)?;
        check_plugin_enabled(self.gate.as_ref(), &plugin).await?;

        let mut cmd = InvocationCommand::for_provider(&plugin.path, &project.name, provider, op);
        let hook = self.cancel_hook(service);
        if let Some(hook) = &hook {
            cmd.set_env(SOCKET_ENV_VAR, hook.addr());
        }
        cmd.push_env(CONTEXT_ENV_VAR, self.context.as_str());
        for (key, value) in &ctx.trace_carrier {
            cmd.push_env(key.as_str(), value.as_str());
        }

        let (process, output) = PluginProcess::start(&cmd, service)?;
        let wait = process.wait_async(ctx.cancel.clone(), hook, self.cancel_grace);

        Ok(Launched { output, wait })
    }

    /// Best effort: without a hook the plugin is killed on cancellation.
    fn cancel_hook(&self, service: &str) -> Option<CancelHook> {
        let relay = self.relay.as_ref()?;
        match relay.new_hook() {
            Ok(hook) => {
                debug!(service = %service, addr = %hook.addr(), "cancellation hook ready");
                Some(hook)
            }
            Err(e) => {
                warn!(service = %service, error = %e, "no cancellation hook; plugin will be killed on cancel");
                None
            }
        }
    }
}

/// Add `variables` to the environment of every direct dependent of
/// `service`, under `<SERVICE>_<KEY>`.
///
/// The prefix is always added, even when the key already starts with it:
/// `HOST` from `db` becomes `DB_HOST`, `DB_HOST` becomes `DB_DB_HOST`.
/// Returns the names of the services that were updated.
pub fn propagate_variables(
    project: &mut ProjectFile,
    service: &str,
    variables: &ResultVariables,
) -> Vec<String> {
    let prefix = format!("{}_", service.to_uppercase());
    let mut updated = Vec::new();

    for (name, svc) in project.service.iter_mut() {
        if !svc.depends_on(service) {
            continue;
        }
        for (key, value) in variables {
            svc.environment.insert(format!("{prefix}{key}"), value.clone());
        }
        updated.push(name.clone());
    }

    updated
}

fn not_a_provider(service: &str) -> ProviderHostError {
    ProviderHostError::ConfigError(format!(
        "service '{service}' is not backed by a provider"
    ))
}
