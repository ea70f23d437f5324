// src/dag/plan.rs

use std::fmt::Write as _;

use crate::dag::graph::DependencyGraph;

/// Ordered stages of component ids.
///
/// Every component appears in exactly one stage and every dependency sits in
/// an earlier stage than its dependents. Ids within a stage are sorted so
/// output and tests are reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionPlan {
    stages: Vec<Vec<String>>,
}

impl ExecutionPlan {
    pub(crate) fn new(stages: Vec<Vec<String>>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Vec<String>] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn component_count(&self) -> usize {
        self.stages.iter().map(Vec::len).sum()
    }

    /// Iterate over all component ids in stage order.
    pub fn component_ids(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().flatten().map(String::as_str)
    }

    /// 0-based stage index of `id`, if it is part of the plan.
    pub fn stage_of(&self, id: &str) -> Option<usize> {
        self.stages
            .iter()
            .position(|stage| stage.iter().any(|c| c == id))
    }

    /// Same stages in reverse order: dependents first, dependencies last.
    pub fn reversed(&self) -> Self {
        let mut stages = self.stages.clone();
        stages.reverse();
        Self { stages }
    }

    /// Human-readable listing of stages, one component per line.
    ///
    /// ```text
    /// Stage 1:
    ///   - Database (terraform) [db]
    /// Stage 2:
    ///   - API (kubernetes) [api]
    /// ```
    pub fn render(&self, graph: &DependencyGraph) -> String {
        let mut out = String::new();
        for (idx, stage) in self.stages.iter().enumerate() {
            let _ = writeln!(out, "Stage {}:", idx + 1);
            for id in stage {
                match graph.component(id) {
                    Some(comp) => {
                        let _ = writeln!(
                            out,
                            "  - {} ({}) [{}]",
                            comp.display_name(),
                            comp.component_type,
                            id
                        );
                    }
                    None => {
                        let _ = writeln!(out, "  - {id}");
                    }
                }
            }
        }
        out
    }
}
