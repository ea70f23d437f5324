// src/engine/mod.rs

//! Deployment engine.
//!
//! The engine owns one validated manifest, its dependency graph and leveled
//! plan, and exposes the user-facing operations:
//!
//! - [`Engine::deploy`] runs the plan forward, or renders it on a dry run,
//! - [`Engine::destroy`] runs the reversed plan,
//! - [`Engine::status`] reports the persisted component states,
//! - [`Engine::preview`] asks each provider what `apply` would change.
//!
//! Actual stage execution is delegated to [`StageExecutor`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::dag::{DependencyGraph, ExecutionPlan};
use crate::errors::{OrchixError, Result};
use crate::exec::{RunSummary, StageExecutor};
use crate::manifest::{Manifest, merge_variables};
use crate::provider::ProviderRegistry;
use crate::state::StateStore;
use crate::types::{Direction, Operation};

pub mod report;

pub use report::{ComponentPreview, DeployOutcome, StatusEntry};

#[derive(Debug)]
pub struct Engine {
    manifest: Manifest,
    graph: DependencyGraph,
    plan: ExecutionPlan,
    registry: Arc<ProviderRegistry>,
    store: Arc<StateStore>,
}

impl Engine {
    /// Build the graph and plan for `manifest`.
    ///
    /// Graph errors (duplicates, unknown dependencies, cycles) surface here,
    /// before any provider is touched.
    pub fn new(
        manifest: Manifest,
        registry: Arc<ProviderRegistry>,
        store: Arc<StateStore>,
    ) -> Result<Self> {
        let graph = DependencyGraph::from_manifest(&manifest)?;
        let plan = graph.execution_order()?;
        debug!(
            app = %manifest.app_name,
            stages = plan.len(),
            components = plan.component_count(),
            "engine ready"
        );

        Ok(Self {
            manifest,
            graph,
            plan,
            registry,
            store,
        })
    }

    /// Deploy all components stage by stage.
    ///
    /// With `dry_run` the plan is only rendered. Otherwise every planned
    /// component is first marked `pending`, then the stages run forward.
    pub async fn deploy(&self, dry_run: bool, cancel: &CancellationToken) -> Result<DeployOutcome> {
        if dry_run {
            info!(app = %self.manifest.app_name, "dry run; nothing will be applied");
            return Ok(DeployOutcome::DryRun(self.render_plan()));
        }

        info!(app = %self.manifest.app_name, target = %self.manifest.target, "deploying");
        self.store.mark_pending(self.plan.component_ids())?;

        let summary = self
            .executor()
            .run(&self.graph, &self.plan, Direction::Deploy, cancel)
            .await?;
        Ok(DeployOutcome::Applied(summary))
    }

    /// Destroy all components, dependents before their dependencies.
    pub async fn destroy(&self, cancel: &CancellationToken) -> Result<RunSummary> {
        info!(app = %self.manifest.app_name, target = %self.manifest.target, "destroying");
        let reversed = self.plan.reversed();
        self.executor()
            .run(&self.graph, &reversed, Direction::Destroy, cancel)
            .await
    }

    /// Persisted state of every recorded component, sorted by id.
    pub fn status(&self) -> Vec<StatusEntry> {
        self.store
            .snapshot()
            .into_iter()
            .map(|(id, state)| {
                let name = self
                    .graph
                    .component(&id)
                    .map(|c| c.display_name().to_string())
                    .unwrap_or_else(|| id.clone());
                StatusEntry {
                    id,
                    name,
                    status: state.status,
                    timestamp: state.timestamp,
                    error: state.error,
                }
            })
            .collect()
    }

    /// Call `Provider::plan` for each component in stage order.
    ///
    /// Components are previewed one at a time and no state is written.
    pub async fn preview(&self, cancel: &CancellationToken) -> Result<Vec<ComponentPreview>> {
        let mut previews = Vec::with_capacity(self.plan.component_count());

        for (idx, stage) in self.plan.stages().iter().enumerate() {
            for id in stage {
                if cancel.is_cancelled() {
                    return Err(OrchixError::Cancelled {
                        stage: idx + 1,
                        operation: Operation::Plan,
                    });
                }

                let Some(component) = self.graph.component(id) else {
                    continue;
                };
                let provider = self.registry.resolve(component)?;
                let variables = merge_variables(&self.manifest.variables, &component.variables);

                let planned = provider
                    .plan(component, &variables, cancel)
                    .await
                    .map_err(|source| OrchixError::ProviderExecution {
                        id: id.clone(),
                        name: component.display_name().to_string(),
                        operation: Operation::Plan,
                        source,
                    })?;

                debug!(component = %id, changes = planned.changes.len(), "previewed component");
                previews.push(ComponentPreview {
                    stage: idx + 1,
                    id: id.clone(),
                    name: component.display_name().to_string(),
                    provider: provider.name().to_string(),
                    changes: planned.changes,
                });
            }
        }

        Ok(previews)
    }

    fn render_plan(&self) -> String {
        let mut out = format!("Execution plan for {}", self.manifest.app_name);
        if !self.manifest.target.is_empty() {
            out.push_str(&format!(" (target: {})", self.manifest.target));
        }
        out.push_str(":\n");
        out.push_str(&self.plan.render(&self.graph));
        out
    }

    fn executor(&self) -> StageExecutor {
        StageExecutor::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            self.manifest.variables.clone(),
        )
    }
}
