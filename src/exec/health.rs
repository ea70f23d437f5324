// src/exec/health.rs

//! Post-apply health polling.
//!
//! A poller starts a deadline `timeout` after it is invoked and probes the
//! provider every `interval`. It ends in exactly one terminal state:
//!
//! - `Healthy` as soon as a probe reports healthy,
//! - `TimedOut` when the deadline passes first,
//! - `Cancelled` as soon as the run's cancellation token fires.
//!
//! A probe that errors counts as "not healthy yet"; only the deadline turns
//! into a failure.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::manifest::{Component, HealthCheck};
use crate::provider::{HealthStatus, Provider};

/// States of the polling state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Healthy,
    TimedOut,
    Cancelled,
}

/// Terminal result of one polling session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub state: PollState,
    /// Number of probes issued.
    pub polls: u32,
    /// Message from the most recent successful probe, if any.
    pub last_message: Option<String>,
}

/// Durations past this are treated as "never"; the same horizon tokio uses.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPoller {
    interval: Duration,
    timeout: Duration,
}

impl From<HealthCheck> for HealthPoller {
    fn from(check: HealthCheck) -> Self {
        Self::new(check.interval, check.timeout)
    }
}

impl HealthPoller {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe `provider` until `component` is healthy, the deadline passes, or
    /// `cancel` fires. The first probe happens one `interval` after start.
    pub async fn wait_until_healthy(
        &self,
        provider: &dyn Provider,
        component: &Component,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let start = Instant::now();
        let deadline = sleep_until(start + self.timeout.min(FAR_FUTURE));
        tokio::pin!(deadline);

        let period = self.interval.min(FAR_FUTURE);
        let mut ticker = interval_at(start + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut state = PollState::Polling;
        let mut polls = 0u32;
        let mut last_message = None;

        debug!(
            component = %component.id,
            interval = ?self.interval,
            timeout = ?self.timeout,
            "health polling started"
        );

        while state == PollState::Polling {
            state = tokio::select! {
                biased;

                _ = cancel.cancelled() => PollState::Cancelled,
                _ = &mut deadline => PollState::TimedOut,
                _ = ticker.tick() => {
                    polls += 1;
                    tokio::select! {
                        biased;

                        _ = cancel.cancelled() => PollState::Cancelled,
                        _ = &mut deadline => PollState::TimedOut,
                        probe = provider.status(component, cancel) => {
                            classify(component, polls, probe, &mut last_message)
                        }
                    }
                }
            };
        }

        match state {
            PollState::Healthy => {
                info!(component = %component.id, polls, "component healthy")
            }
            PollState::TimedOut => {
                warn!(component = %component.id, polls, timeout = ?self.timeout, "health check timed out")
            }
            PollState::Cancelled => {
                warn!(component = %component.id, polls, "health check cancelled")
            }
            PollState::Polling => {}
        }

        PollOutcome {
            state,
            polls,
            last_message,
        }
    }
}

fn classify(
    component: &Component,
    poll: u32,
    probe: anyhow::Result<HealthStatus>,
    last_message: &mut Option<String>,
) -> PollState {
    match probe {
        Ok(status) => {
            debug!(
                component = %component.id,
                poll,
                healthy = status.healthy,
                message = %status.message,
                "health probe"
            );
            let healthy = status.healthy;
            *last_message = Some(status.message);
            if healthy {
                PollState::Healthy
            } else {
                PollState::Polling
            }
        }
        Err(err) => {
            debug!(
                component = %component.id,
                poll,
                error = %err,
                "health probe failed; treating as not healthy yet"
            );
            PollState::Polling
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use anyhow::anyhow;

    use super::*;
    use crate::manifest::Variables;
    use crate::provider::{ApplyResult, PlanResult, ProviderFuture};

    /// Replays scripted probe results; once exhausted, reports unhealthy.
    struct ScriptedProbe {
        script: Mutex<VecDeque<anyhow::Result<HealthStatus>>>,
    }

    impl ScriptedProbe {
        fn new(script: Vec<anyhow::Result<HealthStatus>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    impl Provider for ScriptedProbe {
        fn name(&self) -> &str {
            "scripted"
        }

        fn plan<'a>(
            &'a self,
            _: &'a Component,
            _: &'a Variables,
            _: &'a CancellationToken,
        ) -> ProviderFuture<'a, PlanResult> {
            Box::pin(async { Ok(PlanResult::default()) })
        }

        fn apply<'a>(
            &'a self,
            _: &'a Component,
            _: &'a Variables,
            _: &'a CancellationToken,
        ) -> ProviderFuture<'a, ApplyResult> {
            Box::pin(async { Ok(ApplyResult::default()) })
        }

        fn destroy<'a>(
            &'a self,
            _: &'a Component,
            _: &'a Variables,
            _: &'a CancellationToken,
        ) -> ProviderFuture<'a, ()> {
            Box::pin(async { Ok(()) })
        }

        fn status<'a>(
            &'a self,
            _: &'a Component,
            _: &'a CancellationToken,
        ) -> ProviderFuture<'a, HealthStatus> {
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(HealthStatus::unhealthy("still starting")));
            Box::pin(async move { next })
        }
    }

    fn component() -> Component {
        Component {
            id: "api".to_string(),
            ..Default::default()
        }
    }

    fn assert_near(elapsed: Duration, expected: Duration) {
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(10),
            "elapsed {elapsed:?}, expected about {expected:?}"
        );
    }

    fn poller() -> HealthPoller {
        HealthPoller::new(Duration::from_secs(1), Duration::from_secs(5))
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_on_fourth_poll() {
        let probe = ScriptedProbe::new(vec![
            Ok(HealthStatus::unhealthy("starting")),
            Ok(HealthStatus::unhealthy("starting")),
            Ok(HealthStatus::unhealthy("starting")),
            Ok(HealthStatus::healthy("ready")),
        ]);
        let start = Instant::now();

        let outcome = poller()
            .wait_until_healthy(&probe, &component(), &CancellationToken::new())
            .await;

        assert_eq!(outcome.state, PollState::Healthy);
        assert_eq!(outcome.polls, 4);
        assert_eq!(outcome.last_message.as_deref(), Some("ready"));
        assert_near(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn never_healthy_times_out_at_deadline() {
        let probe = ScriptedProbe::new(vec![]);
        let start = Instant::now();

        let outcome = poller()
            .wait_until_healthy(&probe, &component(), &CancellationToken::new())
            .await;

        assert_eq!(outcome.state, PollState::TimedOut);
        assert_near(start.elapsed(), Duration::from_secs(5));
        assert!(outcome.polls >= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn probe_errors_are_swallowed() {
        let probe = ScriptedProbe::new(vec![
            Err(anyhow!("connection refused")),
            Err(anyhow!("connection refused")),
            Ok(HealthStatus::healthy("ready")),
        ]);

        let outcome = poller()
            .wait_until_healthy(&probe, &component(), &CancellationToken::new())
            .await;

        assert_eq!(outcome.state, PollState::Healthy);
        assert_eq!(outcome.polls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_wins_immediately() {
        let probe = ScriptedProbe::new(vec![]);
        let cancel = CancellationToken::new();
        let start = Instant::now();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            trigger.cancel();
        });

        let outcome = poller()
            .wait_until_healthy(&probe, &component(), &cancel)
            .await;

        assert_eq!(outcome.state, PollState::Cancelled);
        assert_near(start.elapsed(), Duration::from_millis(2500));
        assert_eq!(outcome.polls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_timeout_still_polls_to_healthy() {
        let provider = ScriptedProbe::new(vec![
            Ok(HealthStatus::unhealthy("starting")),
            Ok(HealthStatus::healthy("ready")),
        ]);
        let start = Instant::now();

        let outcome = HealthPoller::new(Duration::from_secs(1), Duration::MAX)
            .wait_until_healthy(&provider, &component(), &CancellationToken::new())
            .await;

        assert_eq!(outcome.state, PollState::Healthy);
        assert_eq!(outcome.polls, 2);
        assert_near(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_interval_times_out_without_polling() {
        let provider = ScriptedProbe::new(vec![]);
        let start = Instant::now();

        let outcome = HealthPoller::new(Duration::from_secs(u64::MAX), Duration::from_secs(5))
            .wait_until_healthy(&provider, &component(), &CancellationToken::new())
            .await;

        assert_eq!(outcome.state, PollState::TimedOut);
        assert_eq!(outcome.polls, 0);
        assert_near(start.elapsed(), Duration::from_secs(5));
    }
}
