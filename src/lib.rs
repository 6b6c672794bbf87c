// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod orchestrator;
pub mod plugin;
pub mod progress;
pub mod protocol;
pub mod types;

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ProjectFile;
use crate::dag::ServiceGraph;
use crate::errors::ProviderHostError;
use crate::orchestrator::{InvocationContext, ProviderRunner};
use crate::progress::SinkKind;
use crate::types::Operation;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - project loading
/// - service ordering
/// - the provider runner and its plugin collaborators
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut project = load_and_validate(&config_path)?;

    let op = args.command.operation();
    let op_args = args.command.args();

    let runner = ProviderRunner::from_project(&project, SinkKind::detect().sink());
    let services = selected_services(&project, op, op_args.service.as_deref())?;
    info!(project = %project.name, operation = %op, ?services, "provider services selected");

    if op_args.dry_run {
        print_dry_run(&runner, &project, &services, op)?;
        return Ok(());
    }

    // Ctrl-C → cancel the running plugin.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            cancel.cancel();
        });
    }

    let ctx = InvocationContext::new(cancel)
        .with_trace_carrier(InvocationContext::carrier_from_env());

    let mut touched = BTreeSet::new();
    for service in &services {
        runner.run_provider(&ctx, &mut project, service, op).await?;
        for dependent in ServiceGraph::from_project(&project).dependents_of(service) {
            touched.insert(dependent.clone());
        }
    }

    if op == Operation::Up {
        print_environments(&project, &touched);
    }

    Ok(())
}

/// Provider services to run, in execution order.
///
/// `up` runs dependencies first, `down` dependents first. With `--service`
/// only that service is returned.
fn selected_services(
    project: &ProjectFile,
    op: Operation,
    only: Option<&str>,
) -> crate::errors::Result<Vec<String>> {
    if let Some(name) = only {
        let svc = project.service(name)?;
        if svc.provider.is_none() {
            return Err(ProviderHostError::ConfigError(format!(
                "service '{name}' is not backed by a provider"
            )));
        }
        return Ok(vec![name.to_string()]);
    }

    let graph = ServiceGraph::from_project(project);
    let order = match op {
        Operation::Up => graph.start_order()?,
        Operation::Down => graph.stop_order()?,
    };
    let providers: BTreeSet<&str> = project.provider_services().collect();

    Ok(order
        .into_iter()
        .filter(|name| providers.contains(name.as_str()))
        .collect())
}

/// Print the environment of every service that received provider variables.
fn print_environments(project: &ProjectFile, services: &BTreeSet<String>) {
    for name in services {
        let Ok(svc) = project.service(name) else {
            continue;
        };
        println!("{name}:");
        for (key, value) in &svc.environment {
            println!("  {key}={value}");
        }
    }
}

/// Dry-run output: the plugin command per provider service.
fn print_dry_run(
    runner: &ProviderRunner,
    project: &ProjectFile,
    services: &[String],
    op: Operation,
) -> Result<()> {
    println!("provider-host dry-run ({op})");
    println!("  project = {}", project.name);
    println!("  context = {}", project.config.context);
    println!();

    println!("services ({}):", services.len());
    for name in services {
        println!("  - {name}");
        match runner.plan(project, name, op) {
            Ok(cmd) => println!("      cmd: {cmd}"),
            Err(e) => println!("      error: {e}"),
        }
        let dependents = ServiceGraph::from_project(project)
            .dependents_of(name)
            .to_vec();
        if !dependents.is_empty() {
            println!("      dependents: {:?}", dependents);
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::config::model::{ConfigSection, ProviderConfig, ServiceConfig};

    fn project() -> ProjectFile {
        let provider = |kind: &str| ServiceConfig {
            provider: Some(ProviderConfig {
                kind: kind.to_string(),
                options: BTreeMap::new(),
            }),
            ..Default::default()
        };
        let mut service = BTreeMap::new();
        service.insert("cache".to_string(), provider("model"));
        service.insert(
            "llm".to_string(),
            ServiceConfig {
                depends_on: vec!["cache".to_string()],
                ..provider("model")
            },
        );
        service.insert(
            "app".to_string(),
            ServiceConfig {
                depends_on: vec!["llm".to_string()],
                ..Default::default()
            },
        );
        ProjectFile::new_unchecked("demo".to_string(), ConfigSection::default(), service)
    }

    #[test]
    fn selects_provider_services_in_dependency_order() {
        let project = project();
        assert_eq!(
            selected_services(&project, Operation::Up, None).unwrap(),
            vec!["cache", "llm"]
        );
        assert_eq!(
            selected_services(&project, Operation::Down, None).unwrap(),
            vec!["llm", "cache"]
        );
    }

    #[test]
    fn single_service_must_be_a_provider() {
        let project = project();
        assert_eq!(
            selected_services(&project, Operation::Up, Some("llm")).unwrap(),
            vec!["llm"]
        );
        assert!(selected_services(&project, Operation::Up, Some("app")).is_err());
        assert!(matches!(
            selected_services(&project, Operation::Up, Some("nope")),
            Err(ProviderHostError::ServiceNotFound(_))
        ));
    }
}
