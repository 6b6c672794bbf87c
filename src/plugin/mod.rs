// src/plugin/mod.rs

//! Collaborators consulted before a provider plugin is launched.
//!
//! - [`resolver`] maps a provider type to a plugin executable.
//! - [`gate`] decides whether provider plugins may run at all, and whether a
//!   given provider is ready.
//! - [`relay`] hands out cancellation hooks: an address the plugin connects
//!   to, closed by the host to ask the plugin to terminate.
//!
//! Each concern is a trait so the orchestrator can be driven by fakes in
//! tests; the concrete types here are what the binary uses.

pub mod gate;
pub mod relay;
pub mod resolver;

pub use gate::{DesktopGate, IntegrationGate, check_plugin_enabled};
pub use relay::{CancelHook, SignalRelay, SocketRelay};
pub use resolver::{CliPluginResolver, Plugin, PluginResolver};
