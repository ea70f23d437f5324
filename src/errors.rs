// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::Operation;

#[derive(Error, Debug)]
pub enum OrchixError {
    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("duplicate component id '{0}'")]
    DuplicateNode(String),

    #[error("unknown component '{missing}' referenced by '{referenced_by}'")]
    UnknownComponent {
        referenced_by: String,
        missing: String,
    },

    #[error("cyclic dependency detected between components: {}", .0.join(", "))]
    CyclicDependency(Vec<String>),

    #[error("no provider registered for type '{component_type}' (component '{component}')")]
    ProviderLookup {
        component: String,
        component_type: String,
    },

    #[error("{operation} failed for component '{name}' ({id}): {source:#}")]
    ProviderExecution {
        id: String,
        name: String,
        operation: Operation,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "health check for component '{name}' ({id}) timed out after {timeout:?} ({polls} polls)"
    )]
    HealthCheckTimeout {
        id: String,
        name: String,
        timeout: Duration,
        polls: u32,
    },

    #[error("health check for component '{name}' ({id}) was cancelled")]
    HealthCheckCancelled { id: String, name: String },

    #[error("state persistence failed for {}: {source:#}", .path.display())]
    StatePersistence {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "stage {stage} ({operation}) failed for {} component(s): {}",
        .failures.len(),
        format_failures(.failures)
    )]
    StageFailed {
        /// 1-based stage number within the executed plan.
        stage: usize,
        operation: Operation,
        failures: Vec<ComponentFailure>,
    },

    #[error("{operation} cancelled before stage {stage} started")]
    Cancelled { stage: usize, operation: Operation },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A single task's failure within a stage.
#[derive(Debug)]
pub struct ComponentFailure {
    pub component: String,
    pub error: OrchixError,
}

fn format_failures(failures: &[ComponentFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("[{}] {}", f.component, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, OrchixError>;
