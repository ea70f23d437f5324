// src/dag/mod.rs

//! Dependency graph and execution planning.
//!
//! - [`graph`] holds components and "must-run-before" edges and computes a
//!   leveled topological order.
//! - [`plan`] is the resulting ordered list of stages.

pub mod graph;
pub mod plan;

pub use graph::DependencyGraph;
pub use plan::ExecutionPlan;
