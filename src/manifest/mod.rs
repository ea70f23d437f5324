// src/manifest/mod.rs

//! Deployment manifest: data model, loading and validation.
//!
//! - [`model`] is the serde-backed in-memory manifest the core consumes.
//! - [`loader`] reads YAML or TOML manifests from disk.
//! - [`validate`] checks structural invariants and dependency correctness.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_manifest};
pub use model::{Component, HealthCheck, Manifest, Variables, merge_variables};
pub use validate::validate_manifest;
