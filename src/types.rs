use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a component as recorded in the state store.
///
/// Within one deploy run a component moves `Pending -> Deploying ->
/// Deployed | Failed`; a later destroy run moves it to `Destroyed` (or
/// `Failed` if the teardown errors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Pending,
    Deploying,
    Deployed,
    Failed,
    Destroyed,
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComponentStatus::Pending => "pending",
            ComponentStatus::Deploying => "deploying",
            ComponentStatus::Deployed => "deployed",
            ComponentStatus::Failed => "failed",
            ComponentStatus::Destroyed => "destroyed",
        };
        f.write_str(s)
    }
}

impl FromStr for ComponentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ComponentStatus::Pending),
            "deploying" => Ok(ComponentStatus::Deploying),
            "deployed" => Ok(ComponentStatus::Deployed),
            "failed" => Ok(ComponentStatus::Failed),
            "destroyed" => Ok(ComponentStatus::Destroyed),
            other => Err(format!("invalid component status: {other}")),
        }
    }
}

/// Direction in which an execution plan is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Stages in plan order, `Provider::apply` per component.
    Deploy,
    /// Stages of the reversed plan, `Provider::destroy` per component.
    Destroy,
}

impl Direction {
    pub fn operation(self) -> Operation {
        match self {
            Direction::Deploy => Operation::Apply,
            Direction::Destroy => Operation::Destroy,
        }
    }
}

/// Provider-facing operation, used to give errors and logs context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Plan,
    Apply,
    Destroy,
    Status,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Plan => "plan",
            Operation::Apply => "apply",
            Operation::Destroy => "destroy",
            Operation::Status => "status",
        };
        f.write_str(s)
    }
}

/// Parse a duration string with a unit suffix: `ms`, `s`, `m` or `h`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let scaled = |factor: u64| {
        value
            .checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration '{}' is too large", s))
    };

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => scaled(60),
        "h" => scaled(60 * 60),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
