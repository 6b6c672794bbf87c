// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::Operation;

/// Command-line arguments for `provider-host`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "provider-host",
    version,
    about = "Create and remove provider-backed services through external plugins.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the project file (TOML).
    ///
    /// Default: `provider-host.toml` in the current working directory.
    #[arg(long, global = true, value_name = "PATH", default_value = "provider-host.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROVIDER_HOST_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create provider services, dependencies first.
    Up(OperationArgs),
    /// Remove provider services, dependents first.
    Down(OperationArgs),
}

impl Command {
    pub fn operation(&self) -> Operation {
        match self {
            Command::Up(_) => Operation::Up,
            Command::Down(_) => Operation::Down,
        }
    }

    pub fn args(&self) -> &OperationArgs {
        match self {
            Command::Up(args) | Command::Down(args) => args,
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct OperationArgs {
    /// Only run the provider of this service.
    #[arg(long, value_name = "NAME")]
    pub service: Option<String>,

    /// Print the plugin commands that would run, but don't run them.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
