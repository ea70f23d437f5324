#![allow(dead_code)]

use std::time::Duration;

use orchix::manifest::{Component, HealthCheck, Manifest, validate_manifest};

/// Builder for `Manifest` to simplify test setup.
pub struct ManifestBuilder {
    manifest: Manifest,
}

impl ManifestBuilder {
    pub fn new(app_name: &str) -> Self {
        Self {
            manifest: Manifest {
                app_name: app_name.to_string(),
                target: "test".to_string(),
                ..Default::default()
            },
        }
    }

    pub fn variable(mut self, key: &str, value: &str) -> Self {
        self.manifest
            .variables
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn component(mut self, component: Component) -> Self {
        self.manifest.components.push(component);
        self
    }

    /// Build and run the same validation the loader applies.
    pub fn build(self) -> Manifest {
        validate_manifest(&self.manifest).expect("Failed to build valid manifest from builder");
        self.manifest
    }

    /// Build without validation, for tests that exercise invalid manifests.
    pub fn build_unchecked(self) -> Manifest {
        self.manifest
    }
}

/// Builder for `Component`. Defaults to the `fake` component type.
pub struct ComponentBuilder {
    component: Component,
}

impl ComponentBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            component: Component {
                id: id.to_string(),
                component_type: "fake".to_string(),
                source: format!("./{id}"),
                ..Default::default()
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.component.name = name.to_string();
        self
    }

    pub fn component_type(mut self, component_type: &str) -> Self {
        self.component.component_type = component_type.to_string();
        self
    }

    pub fn depends_on(mut self, dep: &str) -> Self {
        self.component.depends_on.push(dep.to_string());
        self
    }

    pub fn variable(mut self, key: &str, value: &str) -> Self {
        self.component
            .variables
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn health_check(mut self, interval: Duration, timeout: Duration) -> Self {
        self.component.health_check = Some(HealthCheck { interval, timeout });
        self
    }

    pub fn build(self) -> Component {
        self.component
    }
}
