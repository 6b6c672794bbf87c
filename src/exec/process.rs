// src/exec/process.rs

//! Plugin process driver.
//!
//! Owns the child process from spawn to exit. The exit-wait runs as its own
//! Tokio task so the caller can decode stdout concurrently; its result is
//! retrieved once through [`WaitHandle::join`].

use std::process::ExitStatus;
use std::time::Duration;

use anyhow::anyhow;
use tokio::process::{Child, ChildStdout};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{ProviderHostError, Result};
use crate::exec::command::InvocationCommand;
use crate::plugin::relay::CancelHook;

/// Detail reported when the parent operation was cancelled.
pub const CANCELLED: &str = "operation cancelled";

/// A running plugin process whose stdout has been handed to the caller.
#[derive(Debug)]
pub struct PluginProcess {
    service: String,
    child: Child,
}

impl PluginProcess {
    /// Spawn the plugin and take ownership of its stdout.
    pub fn start(command: &InvocationCommand, service: &str) -> Result<(Self, ChildStdout)> {
        info!(
            service = %service,
            plugin = %command.program.display(),
            args = ?command.args,
            "starting provider plugin"
        );

        let mut child = command.to_command().spawn().map_err(|e| {
            ProviderHostError::Launch(format!("{}: {e}", command.program.display()))
        })?;
        debug!(service = %service, pid = ?child.id(), "provider plugin spawned");

        let stdout = child.stdout.take().ok_or_else(|| {
            ProviderHostError::Launch("plugin process has no stdout".to_string())
        })?;

        Ok((
            Self {
                service: service.to_string(),
                child,
            },
            stdout,
        ))
    }

    /// Start waiting for the process to exit.
    ///
    /// When `cancel` fires the plugin is asked to stop through `hook` and
    /// killed if it is still alive after `grace`; without a hook it is killed
    /// immediately. A cancelled wait always ends in an error.
    pub fn wait_async(
        self,
        cancel: CancellationToken,
        hook: Option<CancelHook>,
        grace: Duration,
    ) -> WaitHandle {
        let handle = tokio::spawn(wait_for_exit(self.service, self.child, cancel, hook, grace));
        WaitHandle { handle }
    }
}

/// Completion of a plugin's exit-wait task.
#[derive(Debug)]
pub struct WaitHandle {
    handle: JoinHandle<Result<ExitStatus>>,
}

impl WaitHandle {
    pub async fn join(self) -> Result<ExitStatus> {
        self.handle
            .await
            .map_err(|e| ProviderHostError::Other(anyhow!("plugin wait task failed: {e}")))?
    }
}

async fn wait_for_exit(
    service: String,
    mut child: Child,
    cancel: CancellationToken,
    mut hook: Option<CancelHook>,
    grace: Duration,
) -> Result<ExitStatus> {
    tokio::select! {
        status = child.wait() => {
            let status = status?;
            info!(
                service = %service,
                exit_code = status.code().unwrap_or(-1),
                success = status.success(),
                "provider plugin exited"
            );
            Ok(status)
        }

        _ = cancel.cancelled() => {
            match hook.as_mut() {
                Some(hook) => {
                    info!(service = %service, "invocation cancelled; signalling provider plugin");
                    hook.fire();
                    match timeout(grace, child.wait()).await {
                        Ok(status) => {
                            debug!(service = %service, status = ?status, "provider plugin stopped after signal");
                        }
                        Err(_) => {
                            warn!(service = %service, grace = ?grace, "provider plugin ignored signal; killing");
                            kill(&service, &mut child).await;
                        }
                    }
                }
                None => {
                    info!(service = %service, "invocation cancelled; killing provider plugin");
                    kill(&service, &mut child).await;
                }
            }
            Err(ProviderHostError::Other(anyhow!(CANCELLED)))
        }
    }
}

async fn kill(service: &str, child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!(service = %service, error = %e, "failed to kill provider plugin");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::PathBuf;

    use tokio::io::AsyncReadExt;

    use super::*;

    fn sh(script: &str) -> InvocationCommand {
        InvocationCommand {
            program: PathBuf::from("/bin/sh"),
            args: vec!["-c".to_string(), script.to_string()],
            env: vec![("PATH".into(), std::env::var_os("PATH").unwrap_or_default())],
        }
    }

    #[tokio::test]
    async fn reports_exit_status() {
        let (process, mut stdout) = PluginProcess::start(&sh("echo hi; exit 3"), "svc").unwrap();
        let wait = process.wait_async(CancellationToken::new(), None, Duration::from_secs(1));

        let mut out = String::new();
        stdout.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hi\n");

        let status = wait.join().await.unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[tokio::test]
    async fn missing_executable_is_launch_error() {
        let cmd = InvocationCommand {
            program: PathBuf::from("/nonexistent/docker-nothing"),
            args: vec![],
            env: vec![],
        };
        assert!(matches!(
            PluginProcess::start(&cmd, "svc"),
            Err(ProviderHostError::Launch(_))
        ));
    }

    #[tokio::test]
    async fn cancellation_kills_and_fails() {
        let (process, _stdout) = PluginProcess::start(&sh("sleep 30"), "svc").unwrap();
        let cancel = CancellationToken::new();
        let wait = process.wait_async(cancel.clone(), None, Duration::from_secs(1));

        cancel.cancel();
        let err = timeout(Duration::from_secs(5), wait.join())
            .await
            .expect("wait did not finish after cancel")
            .unwrap_err();
        assert!(err.to_string().contains(CANCELLED));
    }

    #[tokio::test]
    async fn cancellation_fires_hook_before_kill() {
        let (process, _stdout) = PluginProcess::start(&sh("sleep 30"), "svc").unwrap();
        let cancel = CancellationToken::new();
        let (fired_tx, fired_rx) = tokio::sync::oneshot::channel();
        let hook = CancelHook::new("unused", move || {
            let _ = fired_tx.send(());
        });
        let wait = process.wait_async(cancel.clone(), Some(hook), Duration::from_millis(100));

        cancel.cancel();
        assert!(timeout(Duration::from_secs(5), wait.join()).await.unwrap().is_err());
        assert!(fired_rx.await.is_ok());
    }
}
