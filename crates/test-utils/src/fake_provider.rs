use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::bail;
use tokio_util::sync::CancellationToken;
use orchix::manifest::{Component, Variables};
use orchix::provider::{ApplyResult, Change, HealthStatus, PlanResult, Provider, ProviderFuture};
use orchix::types::Operation;

/// One recorded provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: Operation,
    pub component: String,
    /// Variables the call received; for `status`, the component's own.
    pub variables: Variables,
}

#[derive(Default)]
struct Inner {
    calls: Vec<Call>,
    failures: HashMap<(String, String), String>,
    panics: HashSet<String>,
    outputs: HashMap<String, BTreeMap<String, String>>,
    changes: HashMap<String, Vec<Change>>,
    statuses: HashMap<String, VecDeque<Result<HealthStatus, String>>>,
    never_healthy: HashSet<String>,
    delay: Option<Duration>,
    in_flight: usize,
    max_in_flight: usize,
}

/// A scriptable in-memory provider that:
/// - records every call in order
/// - fails, panics or returns outputs per component as configured
/// - replays scripted health probe results, then reports healthy
///
/// Clones share the same script and call log.
#[derive(Clone, Default)]
pub struct FakeProvider {
    inner: Arc<Mutex<Inner>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `operation` fail for `component` with `message`.
    pub fn fail(self, operation: Operation, component: &str, message: &str) -> Self {
        self.lock().failures.insert(
            (operation.to_string(), component.to_string()),
            message.to_string(),
        );
        self
    }

    /// Panic inside `apply`/`destroy` for `component`.
    pub fn panic_on(self, component: &str) -> Self {
        self.lock().panics.insert(component.to_string());
        self
    }

    pub fn outputs(self, component: &str, outputs: &[(&str, &str)]) -> Self {
        self.lock().outputs.insert(
            component.to_string(),
            outputs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn changes(self, component: &str, changes: &[(&str, &str)]) -> Self {
        self.lock().changes.insert(
            component.to_string(),
            changes
                .iter()
                .map(|(action, address)| Change {
                    action: action.to_string(),
                    address: address.to_string(),
                })
                .collect(),
        );
        self
    }

    /// Probe results for `component`, consumed in order. `Err` entries make
    /// the probe itself fail. Once exhausted the component reports healthy.
    pub fn status_sequence(self, component: &str, script: Vec<Result<HealthStatus, String>>) -> Self {
        self.lock()
            .statuses
            .insert(component.to_string(), script.into());
        self
    }

    pub fn never_healthy(self, component: &str) -> Self {
        self.lock().never_healthy.insert(component.to_string());
        self
    }

    /// Every `apply` and `destroy` takes `delay` (or until cancelled).
    pub fn delay(self, delay: Duration) -> Self {
        self.lock().delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Component ids that received `operation`, in call order.
    pub fn calls_for(&self, operation: Operation) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .map(|c| c.component.clone())
            .collect()
    }

    /// Highest number of concurrently running `apply`/`destroy` calls seen.
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    fn record(&self, operation: Operation, component: &Component, variables: &Variables) {
        self.lock().calls.push(Call {
            operation,
            component: component.id.clone(),
            variables: variables.clone(),
        });
    }

    fn failure(&self, operation: Operation, component: &Component) -> Option<String> {
        self.lock()
            .failures
            .get(&(operation.to_string(), component.id.clone()))
            .cloned()
    }

    async fn mutate(
        &self,
        operation: Operation,
        component: &Component,
        variables: &Variables,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        self.record(operation, component, variables);

        let delay = {
            let mut inner = self.lock();
            inner.in_flight += 1;
            inner.max_in_flight = inner.max_in_flight.max(inner.in_flight);
            inner.delay
        };

        let cancelled = match delay {
            Some(delay) => tokio::select! {
                _ = tokio::time::sleep(delay) => false,
                _ = cancel.cancelled() => true,
            },
            None => false,
        };
        self.lock().in_flight -= 1;

        if cancelled {
            bail!("{} of '{}' cancelled", operation, component.id);
        }
        if self.lock().panics.contains(&component.id) {
            panic!("fake provider panicked on '{}'", component.id);
        }
        if let Some(message) = self.failure(operation, component) {
            bail!(message);
        }
        Ok(())
    }
}

impl Provider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn plan<'a>(
        &'a self,
        component: &'a Component,
        variables: &'a Variables,
        _cancel: &'a CancellationToken,
    ) -> ProviderFuture<'a, PlanResult> {
        Box::pin(async move {
            self.record(Operation::Plan, component, variables);
            if let Some(message) = self.failure(Operation::Plan, component) {
                bail!(message);
            }
            let changes = self
                .lock()
                .changes
                .get(&component.id)
                .cloned()
                .unwrap_or_default();
            Ok(PlanResult {
                changes,
                outputs: BTreeMap::new(),
            })
        })
    }

    fn apply<'a>(
        &'a self,
        component: &'a Component,
        variables: &'a Variables,
        cancel: &'a CancellationToken,
    ) -> ProviderFuture<'a, ApplyResult> {
        Box::pin(async move {
            self.mutate(Operation::Apply, component, variables, cancel)
                .await?;
            let outputs = self
                .lock()
                .outputs
                .get(&component.id)
                .cloned()
                .unwrap_or_default();
            Ok(ApplyResult { outputs })
        })
    }

    fn destroy<'a>(
        &'a self,
        component: &'a Component,
        variables: &'a Variables,
        cancel: &'a CancellationToken,
    ) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            self.mutate(Operation::Destroy, component, variables, cancel)
                .await
        })
    }

    fn status<'a>(
        &'a self,
        component: &'a Component,
        _cancel: &'a CancellationToken,
    ) -> ProviderFuture<'a, HealthStatus> {
        Box::pin(async move {
            self.record(Operation::Status, component, &component.variables);
            let next = {
                let mut inner = self.lock();
                if inner.never_healthy.contains(&component.id) {
                    Some(Ok(HealthStatus::unhealthy("never healthy")))
                } else {
                    inner
                        .statuses
                        .get_mut(&component.id)
                        .and_then(VecDeque::pop_front)
                }
            };
            match next {
                Some(Ok(status)) => Ok(status),
                Some(Err(message)) => bail!(message),
                None => Ok(HealthStatus::healthy("ok")),
            }
        })
    }
}
