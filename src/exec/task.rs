// src/exec/task.rs

//! One component's deploy or destroy, run as an independent tokio task.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::errors::{OrchixError, Result};
use crate::manifest::{Component, Variables};
use crate::provider::{Provider, ProviderRegistry};
use crate::state::{ComponentState, StateStore};
use crate::types::{ComponentStatus, Direction, Operation};

use super::health::{HealthPoller, PollState};

/// Outcome of one component task, reduced by the stage executor.
#[derive(Debug)]
pub struct TaskReport {
    pub component: String,
    pub result: Result<()>,
}

/// Everything a component task needs, owned so it can be moved into
/// `tokio::spawn`.
pub(crate) struct ComponentTask {
    pub component: Component,
    /// Global variables merged with the component's own.
    pub variables: Variables,
    pub direction: Direction,
    pub registry: Arc<ProviderRegistry>,
    pub store: Arc<StateStore>,
    pub cancel: CancellationToken,
}

impl ComponentTask {
    pub async fn run(self) -> TaskReport {
        let result = match self.direction {
            Direction::Deploy => self.deploy().await,
            Direction::Destroy => self.destroy().await,
        };

        if let Err(ref err) = result {
            error!(component = %self.component.id, error = %err, "component {} failed", self.direction.operation());
            record_failure(&self.store, &self.component.id, err);
        }

        TaskReport {
            component: self.component.id,
            result,
        }
    }

    async fn deploy(&self) -> Result<()> {
        let id = &self.component.id;
        let provider = self.registry.resolve(&self.component)?;

        self.store.transition(id, ComponentStatus::Deploying)?;
        info!(component = %id, provider = provider.name(), "applying component");

        let applied = provider
            .apply(&self.component, &self.variables, &self.cancel)
            .await
            .map_err(|source| self.provider_error(Operation::Apply, source))?;

        if let Some(check) = self.component.health_check {
            // Keep the outputs visible while the component is still settling.
            self.store.set_state(
                id,
                ComponentState::new(ComponentStatus::Deploying)
                    .with_outputs(applied.outputs.clone()),
            )?;
            self.wait_healthy(provider.as_ref(), HealthPoller::from(check))
                .await?;
        }

        self.store.set_state(
            id,
            ComponentState::new(ComponentStatus::Deployed).with_outputs(applied.outputs),
        )?;
        info!(component = %id, "component deployed");
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        let id = &self.component.id;
        let provider = self.registry.resolve(&self.component)?;
        info!(component = %id, provider = provider.name(), "destroying component");

        provider
            .destroy(&self.component, &self.variables, &self.cancel)
            .await
            .map_err(|source| self.provider_error(Operation::Destroy, source))?;

        self.store
            .set_state(id, ComponentState::new(ComponentStatus::Destroyed))?;
        info!(component = %id, "component destroyed");
        Ok(())
    }

    async fn wait_healthy(&self, provider: &dyn Provider, poller: HealthPoller) -> Result<()> {
        // Status checks must target what apply targeted, globals included.
        let target = Component {
            variables: self.variables.clone(),
            ..self.component.clone()
        };
        let outcome = poller
            .wait_until_healthy(provider, &target, &self.cancel)
            .await;

        match outcome.state {
            PollState::Healthy => Ok(()),
            PollState::Cancelled => Err(OrchixError::HealthCheckCancelled {
                id: self.component.id.clone(),
                name: self.component.display_name().to_string(),
            }),
            PollState::TimedOut | PollState::Polling => Err(OrchixError::HealthCheckTimeout {
                id: self.component.id.clone(),
                name: self.component.display_name().to_string(),
                timeout: poller.timeout(),
                polls: outcome.polls,
            }),
        }
    }

    fn provider_error(&self, operation: Operation, source: anyhow::Error) -> OrchixError {
        OrchixError::ProviderExecution {
            id: self.component.id.clone(),
            name: self.component.display_name().to_string(),
            operation,
            source,
        }
    }
}

/// Persist `failed` for `id`, keeping known outputs.
///
/// A persistence error here is logged; the task's original error is what
/// gets reported.
pub(crate) fn record_failure(store: &StateStore, id: &str, err: &OrchixError) {
    let outputs = store.get(id).map(|s| s.outputs).unwrap_or_default();
    let state = ComponentState::new(ComponentStatus::Failed)
        .with_outputs(outputs)
        .with_error(err.to_string());

    if let Err(persist_err) = store.set_state(id, state) {
        error!(component = %id, error = %persist_err, "could not record component failure");
    }
}
