// src/dag/mod.rs

//! Service dependency graph.
//!
//! [`graph`] keeps the `depends_on` adjacency of a project, which the
//! orchestrator uses to find the dependents of a provider service and the
//! CLI uses to order `up` / `down`.

pub mod graph;

pub use graph::ServiceGraph;
