// src/manifest/validate.rs

use crate::dag::DependencyGraph;
use crate::errors::{OrchixError, Result};
use crate::manifest::model::Manifest;

/// Check the invariants the core relies on.
///
/// Structural checks run first; then the dependency graph is built and
/// ordered, so duplicate ids, unknown dependencies and cycles surface with
/// the same errors the engine would raise.
pub fn validate_manifest(manifest: &Manifest) -> Result<()> {
    ensure_has_components(manifest)?;
    validate_components(manifest)?;

    let graph = DependencyGraph::from_manifest(manifest)?;
    graph.execution_order()?;
    Ok(())
}

fn ensure_has_components(manifest: &Manifest) -> Result<()> {
    if manifest.components.is_empty() {
        return Err(OrchixError::Manifest(
            "manifest must contain at least one component".to_string(),
        ));
    }
    Ok(())
}

fn validate_components(manifest: &Manifest) -> Result<()> {
    for (idx, comp) in manifest.components.iter().enumerate() {
        if comp.id.trim().is_empty() {
            return Err(OrchixError::Manifest(format!(
                "component #{} has an empty `id`",
                idx + 1
            )));
        }
        if comp.component_type.trim().is_empty() {
            return Err(OrchixError::Manifest(format!(
                "component '{}' has an empty `type`",
                comp.id
            )));
        }
        if let Some(hc) = comp.health_check {
            if hc.interval.is_zero() || hc.timeout.is_zero() {
                return Err(OrchixError::Manifest(format!(
                    "component '{}': healthCheck interval and timeout must be > 0",
                    comp.id
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::manifest::model::{Component, HealthCheck};

    fn component(id: &str, deps: &[&str]) -> Component {
        Component {
            id: id.to_string(),
            component_type: "terraform".to_string(),
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }
    }

    fn manifest(components: Vec<Component>) -> Manifest {
        Manifest {
            app_name: "app".to_string(),
            components,
            ..Default::default()
        }
    }

    #[test]
    fn empty_manifest_is_rejected() {
        let err = validate_manifest(&manifest(vec![])).unwrap_err();
        assert!(matches!(err, OrchixError::Manifest(_)));
    }

    #[test]
    fn empty_type_is_rejected() {
        let mut c = component("db", &[]);
        c.component_type = String::new();
        let err = validate_manifest(&manifest(vec![c])).unwrap_err();
        assert!(err.to_string().contains("empty `type`"));
    }

    #[test]
    fn zero_health_check_timeout_is_rejected() {
        let mut c = component("db", &[]);
        c.health_check = Some(HealthCheck {
            interval: Duration::from_secs(1),
            timeout: Duration::ZERO,
        });
        let err = validate_manifest(&manifest(vec![c])).unwrap_err();
        assert!(matches!(err, OrchixError::Manifest(_)));
    }

    #[test]
    fn graph_errors_surface_at_validation() {
        let err = validate_manifest(&manifest(vec![
            component("a", &["b"]),
            component("b", &["a"]),
        ]))
        .unwrap_err();
        assert!(matches!(err, OrchixError::CyclicDependency(_)));

        let err = validate_manifest(&manifest(vec![component("a", &["ghost"])])).unwrap_err();
        assert!(matches!(err, OrchixError::UnknownComponent { .. }));
    }

    #[test]
    fn valid_chain_passes() {
        validate_manifest(&manifest(vec![
            component("db", &[]),
            component("api", &["db"]),
        ]))
        .unwrap();
    }
}
