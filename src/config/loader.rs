// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{ProjectFile, RawProjectFile};
use crate::errors::Result;

/// Load a project file from a given path and return the raw `RawProjectFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawProjectFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawProjectFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a project file from path and run validation.
///
/// - Reads TOML.
/// - Fills in the project name from the project directory when absent.
/// - Checks for unknown `depends_on` references, dependency cycles, provider
///   declarations and global config sanity.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ProjectFile> {
    let path = path.as_ref();
    let mut raw = load_from_path(path)?;
    if raw.name.is_none() {
        raw.name = project_name_from_dir(path);
    }
    ProjectFile::try_from(raw)
}

/// Derive a project name from the directory holding the project file,
/// normalised to lowercase with unsupported characters dropped.
fn project_name_from_dir(path: &Path) -> Option<String> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().ok()?,
    };
    let dir = dir.canonicalize().unwrap_or(dir);
    let base = dir.file_name()?.to_string_lossy().to_lowercase();

    let name: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let name = name.trim_start_matches(['-', '_']).to_string();

    if name.is_empty() { None } else { Some(name) }
}
