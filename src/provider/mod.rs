// src/provider/mod.rs

//! Pluggable provider backends.
//!
//! The engine talks to a [`Provider`] per component type instead of to a
//! concrete tool. This keeps the core independent of Terraform or
//! Kubernetes and lets tests substitute a scripted fake.
//!
//! - [`registry`] maps component type strings to providers.
//! - [`command`] runs external CLIs with cancellation support.
//! - [`terraform`] and [`kubernetes`] are the CLI-backed backends.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::manifest::{Component, Variables};

pub mod command;
pub mod kubernetes;
pub mod registry;
pub mod terraform;

pub use kubernetes::KubernetesProvider;
pub use registry::ProviderRegistry;
pub use terraform::TerraformProvider;

/// Boxed future returned by provider operations.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

/// Backend that knows how to drive one kind of component.
///
/// Every call receives the run's cancellation token; implementations should
/// stop promptly when it fires. The core never retries a failed call, so
/// any retry policy belongs in the implementation.
pub trait Provider: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &str;

    /// Side-effect-free preview of what `apply` would change.
    fn plan<'a>(
        &'a self,
        component: &'a Component,
        variables: &'a Variables,
        cancel: &'a CancellationToken,
    ) -> ProviderFuture<'a, PlanResult>;

    /// Bring the component to its desired state.
    fn apply<'a>(
        &'a self,
        component: &'a Component,
        variables: &'a Variables,
        cancel: &'a CancellationToken,
    ) -> ProviderFuture<'a, ApplyResult>;

    /// Tear the component down. Destroying something already absent succeeds.
    fn destroy<'a>(
        &'a self,
        component: &'a Component,
        variables: &'a Variables,
        cancel: &'a CancellationToken,
    ) -> ProviderFuture<'a, ()>;

    /// Point-in-time health probe.
    fn status<'a>(
        &'a self,
        component: &'a Component,
        cancel: &'a CancellationToken,
    ) -> ProviderFuture<'a, HealthStatus>;
}

/// One proposed change from [`Provider::plan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    /// e.g. `create`, `update`, `delete`.
    pub action: String,
    /// Backend-specific resource address.
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanResult {
    pub changes: Vec<Change>,
    pub outputs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyResult {
    pub outputs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub healthy: bool,
    pub message: String,
}

impl HealthStatus {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            healthy: true,
            message: message.into(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: message.into(),
        }
    }
}
