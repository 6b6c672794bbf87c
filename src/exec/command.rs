// src/exec/command.rs

//! Construction of the plugin command line and environment.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::config::model::ProviderConfig;
use crate::types::Operation;

/// Set by the CLI when it re-executes itself as a plugin; removed so the
/// provider plugin knows it runs standalone.
pub const REEXEC_ENV_VAR: &str = "DOCKER_CLI_PLUGIN_ORIGINAL_CLI_COMMAND";

/// Address of the cancellation hook the plugin should connect to.
pub const SOCKET_ENV_VAR: &str = "DOCKER_CLI_PLUGIN_SOCKET";

/// Context identifier exported to the plugin.
pub const CONTEXT_ENV_VAR: &str = "DOCKER_CONTEXT";

/// Fully specified plugin launch: program, arguments and the complete
/// environment (the child does not inherit anything else). Environment
/// entries are kept as OS strings so values that are not valid UTF-8 reach
/// the plugin unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<(OsString, OsString)>,
}

impl InvocationCommand {
    /// Build the command for a provider plugin, inheriting the current
    /// process environment minus the reexec marker.
    pub fn for_provider(
        program: &Path,
        project_name: &str,
        provider: &ProviderConfig,
        op: Operation,
    ) -> Self {
        Self {
            program: program.to_path_buf(),
            args: plugin_args(project_name, provider, op),
            env: filter_env(current_env(), REEXEC_ENV_VAR),
        }
    }

    /// Set `key`, replacing any existing entry.
    pub fn set_env(&mut self, key: &str, value: impl Into<OsString>) {
        self.env = replace_env(std::mem::take(&mut self.env), key, value.into());
    }

    /// Append an entry; a later entry for the same key takes precedence.
    pub fn push_env(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) {
        self.env.push((key.into(), value.into()));
    }

    /// Look up the effective value of an environment entry.
    pub fn env_value(&self, key: &str) -> Option<&OsStr> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k.as_os_str() == OsStr::new(key))
            .map(|(_, v)| v.as_os_str())
    }

    /// Tokio command with a cleared environment, stdout piped for the
    /// protocol stream and stderr inherited so plugin diagnostics reach the
    /// operator.
    pub(crate) fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env_clear()
            .envs(self.env.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}

impl fmt::Display for InvocationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// `compose --project-name <project> <command>` followed by one
/// `--<key>=<value>` flag per provider option.
pub fn plugin_args(project_name: &str, provider: &ProviderConfig, op: Operation) -> Vec<String> {
    let mut args = vec![
        "compose".to_string(),
        "--project-name".to_string(),
        project_name.to_string(),
        op.command().to_string(),
    ];
    args.extend(
        provider
            .options
            .iter()
            .map(|(key, value)| format!("--{key}={value}")),
    );
    args
}

/// Drop every entry named `key`.
pub fn filter_env(env: Vec<(OsString, OsString)>, key: &str) -> Vec<(OsString, OsString)> {
    env.into_iter()
        .filter(|(k, _)| k.as_os_str() != OsStr::new(key))
        .collect()
}

/// Drop every entry named `key` and append `key=value`.
pub fn replace_env(
    env: Vec<(OsString, OsString)>,
    key: &str,
    value: OsString,
) -> Vec<(OsString, OsString)> {
    let mut env = filter_env(env, key);
    env.push((OsString::from(key), value));
    env
}

fn current_env() -> Vec<(OsString, OsString)> {
    std::env::vars_os().collect()
}
