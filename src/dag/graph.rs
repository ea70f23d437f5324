// src/dag/graph.rs

use std::collections::BTreeMap;

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::plan::ExecutionPlan;
use crate::errors::{OrchixError, Result};
use crate::manifest::{Component, Manifest};

/// Components plus directed "must-run-before" edges.
///
/// Edges point from a dependency to its dependents. The graph is built once
/// per run and not mutated after [`execution_order`](Self::execution_order)
/// has been computed.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, Component>,
    /// dependency id -> dependent ids
    edges: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from a manifest: one node per component, one edge per
    /// `dependsOn` entry.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self> {
        let mut graph = Self::new();

        for comp in &manifest.components {
            graph.add_node(comp.id.clone(), comp.clone())?;
        }
        for comp in &manifest.components {
            for dep in &comp.depends_on {
                graph.add_edge(dep, &comp.id);
            }
        }

        Ok(graph)
    }

    /// Register a component under `id`.
    pub fn add_node(&mut self, id: impl Into<String>, component: Component) -> Result<()> {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(OrchixError::DuplicateNode(id));
        }
        self.nodes.insert(id, component);
        Ok(())
    }

    /// Record that `dependent` must run after `dependency`.
    ///
    /// Endpoints are not checked here; unknown ids are reported by
    /// [`execution_order`](Self::execution_order).
    pub fn add_edge(&mut self, dependency: &str, dependent: &str) {
        self.edges
            .entry(dependency.to_string())
            .or_default()
            .push(dependent.to_string());
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.nodes.get(id)
    }

    /// Immediate dependents of `id` (components that must run after it).
    pub fn dependents_of(&self, id: &str) -> &[String] {
        self.edges.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Compute a leveled topological order (Kahn's algorithm).
    ///
    /// Each stage is the full set of components whose in-degree dropped to
    /// zero after the previous stage; ids inside a stage are sorted. Fails
    /// without returning a partial plan if an edge names an unknown
    /// component or the graph contains a cycle.
    pub fn execution_order(&self) -> Result<ExecutionPlan> {
        self.check_edge_endpoints()?;

        let mut in_degree: BTreeMap<&str, usize> =
            self.nodes.keys().map(|id| (id.as_str(), 0)).collect();
        for dependents in self.edges.values() {
            for dependent in dependents {
                if let Some(deg) = in_degree.get_mut(dependent.as_str()) {
                    *deg += 1;
                }
            }
        }

        let mut ready: Vec<&str> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut stages: Vec<Vec<String>> = Vec::new();

        while !ready.is_empty() {
            let mut next: Vec<&str> = Vec::new();
            for id in &ready {
                for dependent in self.dependents_of(id) {
                    if let Some(deg) = in_degree.get_mut(dependent.as_str()) {
                        *deg -= 1;
                        if *deg == 0 {
                            next.push(dependent.as_str());
                        }
                    }
                }
            }
            next.sort_unstable();

            stages.push(ready.iter().map(|s| s.to_string()).collect());
            ready = next;
        }

        let blocked: Vec<&str> = in_degree
            .iter()
            .filter(|(_, deg)| **deg > 0)
            .map(|(id, _)| *id)
            .collect();
        if !blocked.is_empty() {
            return Err(OrchixError::CyclicDependency(self.cycle_members(&blocked)));
        }

        debug!(stages = stages.len(), components = self.nodes.len(), "computed execution order");
        Ok(ExecutionPlan::new(stages))
    }

    fn check_edge_endpoints(&self) -> Result<()> {
        for (dependency, dependents) in &self.edges {
            for dependent in dependents {
                if !self.nodes.contains_key(dependency) {
                    return Err(OrchixError::UnknownComponent {
                        referenced_by: dependent.clone(),
                        missing: dependency.clone(),
                    });
                }
                if !self.nodes.contains_key(dependent) {
                    return Err(OrchixError::UnknownComponent {
                        referenced_by: dependency.clone(),
                        missing: dependent.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Narrow the nodes Kahn could not release down to those actually on a
    /// cycle; nodes merely downstream of a cycle are left out.
    fn cycle_members(&self, blocked: &[&str]) -> Vec<String> {
        let mut sub: DiGraphMap<&str, ()> = DiGraphMap::new();
        for &id in blocked {
            sub.add_node(id);
        }
        for &id in blocked {
            for dependent in self.dependents_of(id) {
                if sub.contains_node(dependent.as_str()) {
                    sub.add_edge(id, dependent.as_str(), ());
                }
            }
        }

        let mut members: Vec<String> = tarjan_scc(&sub)
            .into_iter()
            .filter(|scc| scc.len() > 1 || sub.contains_edge(scc[0], scc[0]))
            .flatten()
            .map(|id| id.to_string())
            .collect();

        if members.is_empty() {
            members = blocked.iter().map(|s| s.to_string()).collect();
        }
        members.sort();
        members
    }
}
