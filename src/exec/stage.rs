// src/exec/stage.rs

//! Stage-by-stage execution of a leveled plan.
//!
//! All components of one stage run concurrently as spawned tokio tasks.
//! The executor waits for every task in the stage, then reduces their
//! reports on its own task: any failure stops the run before the next stage.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::dag::{DependencyGraph, ExecutionPlan};
use crate::errors::{ComponentFailure, OrchixError, Result};
use crate::manifest::{Variables, merge_variables};
use crate::provider::ProviderRegistry;
use crate::state::StateStore;
use crate::types::{Direction, Operation};

use super::task::{ComponentTask, TaskReport, record_failure};

/// What a completed run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub operation: Operation,
    /// Stages in the order they were executed.
    pub stages: Vec<Vec<String>>,
}

impl RunSummary {
    pub fn component_count(&self) -> usize {
        self.stages.iter().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone)]
pub struct StageExecutor {
    registry: Arc<ProviderRegistry>,
    store: Arc<StateStore>,
    global_variables: Variables,
}

impl StageExecutor {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        store: Arc<StateStore>,
        global_variables: Variables,
    ) -> Self {
        Self {
            registry,
            store,
            global_variables,
        }
    }

    /// Run every stage of `plan` in order for `direction`.
    ///
    /// Stage N+1 starts only after every task of stage N has finished
    /// successfully. Cancellation is checked before each stage; a stage that
    /// has started is always waited for.
    pub async fn run(
        &self,
        graph: &DependencyGraph,
        plan: &ExecutionPlan,
        direction: Direction,
        cancel: &CancellationToken,
    ) -> Result<RunSummary> {
        let operation = direction.operation();
        info!(%operation, stages = plan.len(), components = plan.component_count(), "run started");

        let mut summary = RunSummary {
            operation,
            stages: Vec::with_capacity(plan.len()),
        };

        for (idx, stage) in plan.stages().iter().enumerate() {
            let number = idx + 1;
            if cancel.is_cancelled() {
                warn!(%operation, stage = number, "run cancelled");
                return Err(OrchixError::Cancelled {
                    stage: number,
                    operation,
                });
            }

            info!(%operation, stage = number, components = ?stage, "stage started");
            let reports = self.run_stage(graph, stage, direction, cancel).await;

            let failures: Vec<ComponentFailure> = reports
                .into_iter()
                .filter_map(|report| {
                    report.result.err().map(|error| ComponentFailure {
                        component: report.component,
                        error,
                    })
                })
                .collect();

            if !failures.is_empty() {
                error!(%operation, stage = number, failed = failures.len(), "stage failed");
                return Err(OrchixError::StageFailed {
                    stage: number,
                    operation,
                    failures,
                });
            }

            info!(%operation, stage = number, "stage finished");
            summary.stages.push(stage.clone());
        }

        info!(%operation, components = summary.component_count(), "run finished");
        Ok(summary)
    }

    async fn run_stage(
        &self,
        graph: &DependencyGraph,
        stage: &[String],
        direction: Direction,
        cancel: &CancellationToken,
    ) -> Vec<TaskReport> {
        let mut reports = Vec::with_capacity(stage.len());
        let mut handles: Vec<(String, JoinHandle<TaskReport>)> = Vec::with_capacity(stage.len());

        for id in stage {
            let Some(component) = graph.component(id) else {
                reports.push(TaskReport {
                    component: id.clone(),
                    result: Err(OrchixError::UnknownComponent {
                        referenced_by: "execution plan".to_string(),
                        missing: id.clone(),
                    }),
                });
                continue;
            };

            let task = ComponentTask {
                component: component.clone(),
                variables: merge_variables(&self.global_variables, &component.variables),
                direction,
                registry: Arc::clone(&self.registry),
                store: Arc::clone(&self.store),
                cancel: cancel.clone(),
            };
            handles.push((id.clone(), tokio::spawn(task.run())));
        }

        for (id, handle) in handles {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(join_err) => {
                    let err = OrchixError::Other(anyhow::anyhow!(
                        "task for component '{id}' aborted: {join_err}"
                    ));
                    error!(component = %id, error = %err, "component task did not complete");
                    record_failure(&self.store, &id, &err);
                    reports.push(TaskReport {
                        component: id,
                        result: Err(err),
                    });
                }
            }
        }

        reports
    }
}
