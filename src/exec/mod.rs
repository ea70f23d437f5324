// src/exec/mod.rs

//! Execution layer.
//!
//! Turns an [`ExecutionPlan`](crate::dag::ExecutionPlan) into provider calls
//! and state writes.
//!
//! - [`stage`] owns the stage loop and the per-stage barrier.
//! - [`task`] runs a single component's deploy or destroy.
//! - [`health`] polls a freshly applied component until it is healthy.

pub mod health;
pub mod stage;
pub mod task;

pub use health::{HealthPoller, PollOutcome, PollState};
pub use stage::{RunSummary, StageExecutor};
pub use task::TaskReport;
