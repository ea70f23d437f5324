// src/provider/registry.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::errors::{OrchixError, Result};
use crate::manifest::Component;

use super::Provider;

/// Component type -> provider mapping.
///
/// Populated before the engine is constructed and only read afterwards.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.providers.keys().collect();
        types.sort();
        f.debug_struct("ProviderRegistry")
            .field("types", &types)
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` for `component_type`, replacing any previous one.
    pub fn register(&mut self, component_type: impl Into<String>, provider: Arc<dyn Provider>) {
        let component_type = component_type.into();
        debug!(%component_type, provider = provider.name(), "registered provider");
        self.providers.insert(component_type, provider);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, component_type: impl Into<String>, provider: Arc<dyn Provider>) -> Self {
        self.register(component_type, provider);
        self
    }

    pub fn get(&self, component_type: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(component_type).cloned()
    }

    /// Provider for `component`'s type, or [`OrchixError::ProviderLookup`].
    pub fn resolve(&self, component: &Component) -> Result<Arc<dyn Provider>> {
        self.get(&component.component_type)
            .ok_or_else(|| OrchixError::ProviderLookup {
                component: component.id.clone(),
                component_type: component.component_type.clone(),
            })
    }
}
