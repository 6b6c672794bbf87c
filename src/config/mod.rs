// src/config/mod.rs

//! Project configuration for provider-host.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a project file from disk (`loader.rs`).
//! - Validate service dependencies and global settings (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigSection, ProjectFile, ProviderConfig, RawProjectFile, ServiceConfig};
