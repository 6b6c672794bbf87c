// src/config/validate.rs

use std::sync::LazyLock;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use regex::Regex;

use crate::config::duration::parse_duration;
use crate::config::model::{ProjectFile, RawProjectFile};
use crate::errors::{ProviderHostError, Result};

static PROJECT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("project name pattern is valid")
});

impl TryFrom<RawProjectFile> for ProjectFile {
    type Error = ProviderHostError;

    fn try_from(raw: RawProjectFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_project(&raw)?;
        let name = raw.name.unwrap_or_default();
        Ok(ProjectFile::new_unchecked(name, raw.config, raw.service))
    }
}

fn validate_raw_project(cfg: &RawProjectFile) -> Result<()> {
    validate_project_name(cfg)?;
    ensure_has_services(cfg)?;
    validate_global_config(cfg)?;
    validate_providers(cfg)?;
    validate_service_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn validate_project_name(cfg: &RawProjectFile) -> Result<()> {
    match cfg.name.as_deref() {
        None | Some("") => Err(ProviderHostError::ConfigError(
            "project name is required".to_string(),
        )),
        Some(name) if !PROJECT_NAME.is_match(name) => Err(ProviderHostError::ConfigError(
            format!(
                "invalid project name '{}': must contain only lowercase letters, digits, '-' and '_' and start with a letter or digit",
                name
            ),
        )),
        Some(_) => Ok(()),
    }
}

fn ensure_has_services(cfg: &RawProjectFile) -> Result<()> {
    if cfg.service.is_empty() {
        return Err(ProviderHostError::ConfigError(
            "project must contain at least one [service.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawProjectFile) -> Result<()> {
    let grace = parse_duration(&cfg.config.cancel_grace).map_err(|e| {
        ProviderHostError::ConfigError(format!("invalid [config].cancel_grace: {e}"))
    })?;
    if grace.is_zero() {
        return Err(ProviderHostError::ConfigError(
            "[config].cancel_grace must be greater than zero".to_string(),
        ));
    }

    if cfg.config.context.trim().is_empty() {
        return Err(ProviderHostError::ConfigError(
            "[config].context must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_providers(cfg: &RawProjectFile) -> Result<()> {
    for (name, svc) in cfg.service.iter() {
        if let Some(provider) = &svc.provider {
            if provider.kind.trim().is_empty() {
                return Err(ProviderHostError::ConfigError(format!(
                    "service '{}' declares a provider without a `type`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_service_dependencies(cfg: &RawProjectFile) -> Result<()> {
    for (name, svc) in cfg.service.iter() {
        for dep in svc.depends_on.iter() {
            if !cfg.service.contains_key(dep) {
                return Err(ProviderHostError::ConfigError(format!(
                    "service '{}' has unknown dependency '{}' in `depends_on`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(ProviderHostError::ConfigError(format!(
                    "service '{}' cannot depend on itself in `depends_on`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawProjectFile) -> Result<()> {
    // Edge direction: dependency -> dependent.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.service.keys() {
        graph.add_node(name.as_str());
    }

    for (name, svc) in cfg.service.iter() {
        for dep in svc.depends_on.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(ProviderHostError::DagCycle(format!(
                "cycle detected in service dependencies involving service '{}'",
                node
            )))
        }
    }
}
