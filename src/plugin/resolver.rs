// src/plugin/resolver.rs

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::errors::{ProviderHostError, Result};

/// Prefix shared by CLI plugin executables (`docker-model`, ...).
pub const PLUGIN_PREFIX: &str = "docker-";

static PLUGIN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9]*$").expect("plugin name pattern is valid"));

/// A resolved provider plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plugin {
    /// Provider type the plugin was resolved for, e.g. `"model"`.
    pub name: String,
    /// Absolute path to the executable.
    pub path: PathBuf,
}

/// Maps a provider type to an executable.
pub trait PluginResolver: Send + Sync {
    fn resolve(&self, provider_type: &str) -> Result<Plugin>;
}

/// Resolves `docker-<type>` executables from a list of plugin directories,
/// first match wins.
#[derive(Debug, Clone)]
pub struct CliPluginResolver {
    dirs: Vec<PathBuf>,
}

impl CliPluginResolver {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// `extra` directories first, then the user's CLI plugin directory,
    /// then the system-wide ones.
    pub fn with_default_dirs(extra: Vec<PathBuf>) -> Self {
        let mut dirs: Vec<PathBuf> = extra.iter().map(|d| expand_home(d)).collect();
        if let Some(user_dir) = user_plugin_dir() {
            dirs.push(user_dir);
        }
        if cfg!(windows) {
            if let Some(program_data) = std::env::var_os("ProgramData") {
                dirs.push(PathBuf::from(program_data).join(r"Docker\cli-plugins"));
            }
        } else {
            for dir in [
                "/usr/local/lib/docker/cli-plugins",
                "/usr/local/libexec/docker/cli-plugins",
                "/usr/lib/docker/cli-plugins",
                "/usr/libexec/docker/cli-plugins",
            ] {
                dirs.push(PathBuf::from(dir));
            }
        }
        Self { dirs }
    }
}

impl PluginResolver for CliPluginResolver {
    fn resolve(&self, provider_type: &str) -> Result<Plugin> {
        if !PLUGIN_NAME.is_match(provider_type) {
            return Err(ProviderHostError::Resolution(format!(
                "invalid provider type {provider_type:?}: plugin names must match {}",
                PLUGIN_NAME.as_str()
            )));
        }

        let file_name = format!("{PLUGIN_PREFIX}{provider_type}{}", std::env::consts::EXE_SUFFIX);
        for dir in &self.dirs {
            let candidate = dir.join(&file_name);
            if candidate.is_file() {
                let path = candidate.canonicalize().unwrap_or(candidate);
                debug!(provider = %provider_type, path = %path.display(), "resolved provider plugin");
                return Ok(Plugin {
                    name: provider_type.to_string(),
                    path,
                });
            }
        }

        Err(ProviderHostError::Resolution(format!(
            "provider plugin {provider_type:?} not found: no {file_name} in {}",
            self.dirs
                .iter()
                .map(|d| d.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }
}

fn user_plugin_dir() -> Option<PathBuf> {
    if let Some(config) = std::env::var_os("DOCKER_CONFIG") {
        return Some(PathBuf::from(config).join("cli-plugins"));
    }
    home_dir().map(|home| home.join(".docker").join("cli-plugins"))
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home_dir().map(|h| h.join(rest)).unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_names_before_searching() {
        let resolver = CliPluginResolver::new(vec![]);
        for name in ["Model", "../evil", "", "my-plugin"] {
            assert!(matches!(
                resolver.resolve(name),
                Err(ProviderHostError::Resolution(_))
            ));
        }
    }

    #[test]
    fn unknown_provider_is_resolution_error() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = CliPluginResolver::new(vec![dir.path().to_path_buf()]);
        let err = resolver.resolve("unknownprovider").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn finds_plugin_in_first_matching_dir() {
        let empty = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let file = dir
            .path()
            .join(format!("docker-model{}", std::env::consts::EXE_SUFFIX));
        std::fs::write(&file, "").unwrap();

        let resolver =
            CliPluginResolver::new(vec![empty.path().to_path_buf(), dir.path().to_path_buf()]);
        let plugin = resolver.resolve("model").unwrap();
        assert_eq!(plugin.name, "model");
        assert!(plugin.path.ends_with(file.file_name().unwrap()));
    }
}
