// src/manifest/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::types::parse_duration;

/// String-to-string variables passed through to providers.
pub type Variables = BTreeMap<String, String>;

/// A deployment manifest.
///
/// ```yaml
/// appName: shop
/// target: staging
/// variables:
///   region: eu-west-1
/// components:
///   - id: db
///     name: Database
///     type: terraform
///     source: ./infra/db
///   - id: api
///     type: kubernetes
///     source: ./k8s/api.yaml
///     dependsOn: [db]
///     healthCheck:
///       interval: 2s
///       timeout: 1m
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub api_version: Option<String>,

    pub app_name: String,

    #[serde(default)]
    pub target: String,

    /// Global variables; component-local variables override these.
    #[serde(default)]
    pub variables: Variables,

    #[serde(default)]
    pub components: Vec<Component>,
}

impl Manifest {
    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }
}

/// One deployable unit.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: String,

    /// Display name; falls back to `id` when empty.
    #[serde(default)]
    pub name: String,

    /// Selects the provider (e.g. `"terraform"`, `"kubernetes"`).
    #[serde(rename = "type")]
    pub component_type: String,

    /// Opaque location handed to the provider.
    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub depends_on: Vec<String>,

    #[serde(default)]
    pub variables: Variables,

    #[serde(default)]
    pub health_check: Option<HealthCheck>,
}

impl Component {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Bounded polling parameters for post-apply health checks.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct HealthCheck {
    #[serde(deserialize_with = "deserialize_duration")]
    pub interval: Duration,

    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

/// Durations are either whole seconds (`5`) or strings with a unit (`"5s"`).
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDuration {
        Seconds(u64),
        Text(String),
    }

    match RawDuration::deserialize(deserializer)? {
        RawDuration::Seconds(secs) => Ok(Duration::from_secs(secs)),
        RawDuration::Text(s) => parse_duration(&s).map_err(serde::de::Error::custom),
    }
}

/// Merge global and component-local variables; local wins on collision.
pub fn merge_variables(global: &Variables, local: &Variables) -> Variables {
    let mut merged = global.clone();
    merged.extend(local.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}
