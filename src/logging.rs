// src/logging.rs

//! Logging setup for `provider-host` using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from, in order:
//! 1. `--log-level` (applies to every target)
//! 2. `PROVIDER_HOST_LOG`, any `EnvFilter` directive list such as
//!    `provider_host::exec=debug,info`
//! 3. `info`
//!
//! Logs go to stderr; stdout carries the resulting service environments.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "PROVIDER_HOST_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Initialise the global logging subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(cli_level, env.as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))?;

    Ok(())
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    if let Some(level) = cli_level {
        return Ok(EnvFilter::new(level_directive(level)));
    }

    match env.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid {LOG_ENV_VAR} value {directives:?}")),
        None => Ok(EnvFilter::new(DEFAULT_DIRECTIVE)),
    }
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_overrides_environment() {
        let filter = build_filter(Some(LogLevel::Debug), Some("error")).unwrap();
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn environment_accepts_per_target_directives() {
        let filter = build_filter(None, Some(" provider_host::exec=trace ")).unwrap();
        assert!(filter.to_string().contains("provider_host::exec=trace"));

        let filter = build_filter(None, Some("")).unwrap();
        assert_eq!(filter.to_string(), DEFAULT_DIRECTIVE);
    }

    #[test]
    fn malformed_environment_is_an_error() {
        let err = build_filter(None, Some("provider_host=loud")).unwrap_err();
        assert!(err.to_string().contains(LOG_ENV_VAR));
    }
}
