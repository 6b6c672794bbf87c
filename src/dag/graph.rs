// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::ProjectFile;
use crate::errors::{ProviderHostError, Result};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct ServiceNode {
    /// Services listed in this one's `depends_on`.
    deps: Vec<String>,
    /// Services that list this one in their `depends_on`.
    dependents: Vec<String>,
}

/// In-memory dependency graph keyed by service name.
///
/// Acyclicity is validated when the project is loaded; here we only keep
/// adjacency information for ordering and variable propagation.
#[derive(Debug, Clone)]
pub struct ServiceGraph {
    nodes: HashMap<String, ServiceNode>,
}

impl ServiceGraph {
    /// Build the graph from a validated [`ProjectFile`].
    pub fn from_project(project: &ProjectFile) -> Self {
        let mut nodes: HashMap<String, ServiceNode> = project
            .service
            .iter()
            .map(|(name, svc)| {
                (
                    name.clone(),
                    ServiceNode {
                        deps: svc.depends_on.clone(),
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();

        for (name, svc) in project.service.iter() {
            for dep in svc.depends_on.iter() {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.push(name.clone());
                }
            }
        }

        for node in nodes.values_mut() {
            node.dependents.sort();
        }

        Self { nodes }
    }

    /// Return all service names.
    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    /// Immediate dependencies of a service.
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a service.
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Services ordered so that every dependency precedes its dependents.
    ///
    /// Ties are broken by name so the order is stable across runs.
    pub fn start_order(&self) -> Result<Vec<String>> {
        let mut names: Vec<&str> = self.services().collect();
        names.sort_unstable();

        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for &name in names.iter() {
            graph.add_node(name);
        }
        for &name in names.iter() {
            for dep in self.dependencies_of(name) {
                graph.add_edge(dep.as_str(), name, ());
            }
        }

        toposort(&graph, None)
            .map(|order| order.into_iter().map(str::to_string).collect())
            .map_err(|cycle| {
                ProviderHostError::DagCycle(format!(
                    "cycle detected in service dependencies involving service '{}'",
                    cycle.node_id()
                ))
            })
    }

    /// Reverse of [`start_order`](Self::start_order): dependents first.
    pub fn stop_order(&self) -> Result<Vec<String>> {
        let mut order = self.start_order()?;
        order.reverse();
        Ok(order)
    }
}
