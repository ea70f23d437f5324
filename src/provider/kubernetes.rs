// src/provider/kubernetes.rs

//! Kubernetes backend driven through `kubectl`.
//!
//! The component `source` is a manifest file or directory accepted by
//! `kubectl -f`. A `namespace` variable selects the target namespace.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::manifest::{Component, Variables};

use super::command::{CommandOutput, run_command};
use super::{ApplyResult, Change, HealthStatus, PlanResult, Provider, ProviderFuture};

#[derive(Debug, Clone)]
pub struct KubernetesProvider {
    binary: String,
    kubeconfig: Option<PathBuf>,
}

impl Default for KubernetesProvider {
    fn default() -> Self {
        Self::new("kubectl", None)
    }
}

impl KubernetesProvider {
    pub fn new(binary: impl Into<String>, kubeconfig: Option<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            kubeconfig,
        }
    }

    fn args(&self, verb: &str, component: &Component, variables: &Variables) -> Vec<String> {
        let mut args = vec![verb.to_string(), "-f".to_string(), component.source.clone()];
        if let Some(ref kubeconfig) = self.kubeconfig {
            args.push("--kubeconfig".to_string());
            args.push(kubeconfig.display().to_string());
        }
        if let Some(ns) = variables.get("namespace") {
            args.push("-n".to_string());
            args.push(ns.clone());
        }
        args
    }

    async fn kubectl(
        &self,
        args: Vec<String>,
        cancel: &CancellationToken,
        accepted: &[i32],
    ) -> Result<CommandOutput> {
        run_command(&self.binary, &args, None, cancel)
            .await?
            .ensure_code(&self.binary, accepted)
    }
}

impl Provider for KubernetesProvider {
    fn name(&self) -> &str {
        "kubernetes"
    }

    fn plan<'a>(
        &'a self,
        component: &'a Component,
        variables: &'a Variables,
        cancel: &'a CancellationToken,
    ) -> ProviderFuture<'a, PlanResult> {
        Box::pin(async move {
            // `kubectl diff` exits 1 when differences exist.
            let out = self
                .kubectl(self.args("diff", component, variables), cancel, &[0, 1])
                .await
                .context("kubectl diff")?;
            Ok(PlanResult {
                changes: parse_diff_changes(&out.stdout),
                outputs: BTreeMap::new(),
            })
        })
    }

    fn apply<'a>(
        &'a self,
        component: &'a Component,
        variables: &'a Variables,
        cancel: &'a CancellationToken,
    ) -> ProviderFuture<'a, ApplyResult> {
        Box::pin(async move {
            let mut args = self.args("apply", component, variables);
            args.extend(["-o".to_string(), "name".to_string()]);
            let out = self
                .kubectl(args, cancel, &[0])
                .await
                .context("kubectl apply")?;

            let resources: Vec<&str> = out
                .stdout
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect();
            info!(component = %component.id, resources = resources.len(), "kubectl apply finished");

            let mut outputs = BTreeMap::new();
            outputs.insert("resources".to_string(), resources.join(","));
            if let Some(ns) = variables.get("namespace") {
                outputs.insert("namespace".to_string(), ns.clone());
            }
            Ok(ApplyResult { outputs })
        })
    }

    fn destroy<'a>(
        &'a self,
        component: &'a Component,
        variables: &'a Variables,
        cancel: &'a CancellationToken,
    ) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let mut args = self.args("delete", component, variables);
            args.push("--ignore-not-found=true".to_string());
            self.kubectl(args, cancel, &[0])
                .await
                .context("kubectl delete")?;
            Ok(())
        })
    }

    fn status<'a>(
        &'a self,
        component: &'a Component,
        cancel: &'a CancellationToken,
    ) -> ProviderFuture<'a, HealthStatus> {
        Box::pin(async move {
            let mut args = self.args("get", component, &component.variables);
            args.extend(["-o".to_string(), "json".to_string()]);
            let out = self
                .kubectl(args, cancel, &[0])
                .await
                .context("kubectl get")?;
            let doc: Value =
                serde_json::from_str(&out.stdout).context("parsing kubectl get output")?;
            Ok(readiness(&doc))
        })
    }
}

/// Derive health from workload replica counts in `kubectl get -o json`.
///
/// Objects without replica semantics (services, config maps, ...) count as
/// ready.
fn readiness(doc: &Value) -> HealthStatus {
    let items: Vec<&Value> = match doc["items"].as_array() {
        Some(items) => items.iter().collect(),
        None => vec![doc],
    };

    let mut not_ready = Vec::new();
    for item in &items {
        let kind = item["kind"].as_str().unwrap_or("object");
        let name = item["metadata"]["name"].as_str().unwrap_or("?");
        let status = &item["status"];

        let (ready, desired) = match kind {
            "Deployment" | "StatefulSet" | "ReplicaSet" => (
                status["readyReplicas"].as_u64().unwrap_or(0),
                item["spec"]["replicas"].as_u64().unwrap_or(1),
            ),
            "DaemonSet" => (
                status["numberReady"].as_u64().unwrap_or(0),
                status["desiredNumberScheduled"].as_u64().unwrap_or(0),
            ),
            _ => continue,
        };

        if ready < desired {
            not_ready.push(format!(
                "{}/{}: {}/{} ready",
                kind.to_lowercase(),
                name,
                ready,
                desired
            ));
        }
    }

    if not_ready.is_empty() {
        HealthStatus::healthy(format!("{} object(s) ready", items.len()))
    } else {
        HealthStatus::unhealthy(not_ready.join(", "))
    }
}

/// Extract changed objects from `kubectl diff` output headers.
///
/// Header lines look like `diff -u -N /tmp/LIVE-1/apps.v1.Deployment.default.web /tmp/MERGED-2/...`.
fn parse_diff_changes(diff: &str) -> Vec<Change> {
    diff.lines()
        .filter(|l| l.starts_with("diff "))
        .filter_map(|l| l.split_whitespace().last())
        .filter_map(|path| path.rsplit('/').next())
        .map(|object| Change {
            action: "update".to_string(),
            address: object.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn args_include_kubeconfig_and_namespace() {
        let provider = KubernetesProvider::new("kubectl", Some(PathBuf::from("/k/config")));
        let comp = Component {
            id: "api".to_string(),
            source: "k8s/api.yaml".to_string(),
            ..Default::default()
        };
        let vars = Variables::from([("namespace".to_string(), "shop".to_string())]);

        assert_eq!(
            provider.args("apply", &comp, &vars),
            vec![
                "apply",
                "-f",
                "k8s/api.yaml",
                "--kubeconfig",
                "/k/config",
                "-n",
                "shop"
            ]
        );
    }

    #[test]
    fn deployment_with_missing_replicas_is_unhealthy() {
        let doc = json!({
            "kind": "List",
            "items": [
                {"kind": "Service", "metadata": {"name": "api"}},
                {
                    "kind": "Deployment",
                    "metadata": {"name": "api"},
                    "spec": {"replicas": 3},
                    "status": {"readyReplicas": 1}
                }
            ]
        });
        let health = readiness(&doc);
        assert!(!health.healthy);
        assert_eq!(health.message, "deployment/api: 1/3 ready");
    }

    #[test]
    fn fully_rolled_out_objects_are_healthy() {
        let doc = json!({
            "kind": "Deployment",
            "metadata": {"name": "web"},
            "spec": {"replicas": 2},
            "status": {"readyReplicas": 2}
        });
        let health = readiness(&doc);
        assert!(health.healthy);
        assert_eq!(health.message, "1 object(s) ready");
    }

    #[test]
    fn diff_headers_become_changes() {
        let diff = "diff -u -N /tmp/LIVE-1/apps.v1.Deployment.default.web /tmp/MERGED-2/apps.v1.Deployment.default.web\n\
                    --- /tmp/LIVE-1/apps.v1.Deployment.default.web\n\
                    +  replicas: 3\n";
        assert_eq!(
            parse_diff_changes(diff),
            vec![Change {
                action: "update".to_string(),
                address: "apps.v1.Deployment.default.web".to_string()
            }]
        );
    }
}
