// src/exec/mod.rs

//! Plugin execution layer.
//!
//! - [`command`] builds the plugin command line and environment.
//! - [`process`] spawns the plugin and waits for it in a separate task,
//!   wiring cancellation to the plugin.
//! - [`decoder`] reads the plugin's message stream concurrently with that
//!   wait and joins it before reporting the outcome.

pub mod command;
pub mod decoder;
pub mod process;

pub use command::InvocationCommand;
pub use decoder::{decode_stream, execute_plugin};
pub use process::{PluginProcess, WaitHandle};
