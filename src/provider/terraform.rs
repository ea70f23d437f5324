// src/provider/terraform.rs

//! Terraform CLI backend.
//!
//! The component `source` is a Terraform working directory. Commands run in
//! place so Terraform's own state stays with the configuration.
//!
//! Variables reach Terraform through a generated var file rather than `-var`
//! flags. Terraform rejects `-var` for undeclared variables but only warns
//! for undeclared values in a var file, and the merged set carries globals
//! meant for other providers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::manifest::{Component, Variables};

/// Written into the working directory before every plan, apply and destroy.
pub const VAR_FILE: &str = "orchix.tfvars.json";

use super::command::{CommandOutput, run_command};
use super::{ApplyResult, Change, HealthStatus, PlanResult, Provider, ProviderFuture};

#[derive(Debug, Clone)]
pub struct TerraformProvider {
    binary: String,
}

impl Default for TerraformProvider {
    fn default() -> Self {
        Self::new("terraform")
    }
}

impl TerraformProvider {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn terraform(
        &self,
        dir: &Path,
        args: Vec<String>,
        cancel: &CancellationToken,
        accepted: &[i32],
    ) -> Result<CommandOutput> {
        run_command(&self.binary, &args, Some(dir), cancel)
            .await?
            .ensure_code(&self.binary, accepted)
    }

    async fn init(&self, dir: &Path, cancel: &CancellationToken) -> Result<()> {
        self.terraform(
            dir,
            strings(&["init", "-input=false", "-no-color"]),
            cancel,
            &[0],
        )
        .await
        .context("terraform init")?;
        Ok(())
    }

    async fn outputs(
        &self,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<String, String>> {
        let out = self
            .terraform(dir, strings(&["output", "-json"]), cancel, &[0])
            .await
            .context("terraform output")?;
        parse_outputs(&out.stdout)
    }
}

impl Provider for TerraformProvider {
    fn name(&self) -> &str {
        "terraform"
    }

    fn plan<'a>(
        &'a self,
        component: &'a Component,
        variables: &'a Variables,
        cancel: &'a CancellationToken,
    ) -> ProviderFuture<'a, PlanResult> {
        Box::pin(async move {
            let dir = working_dir(component)?;
            self.init(&dir, cancel).await?;

            let mut args = strings(&["plan", "-input=false", "-no-color", "-json"]);
            args.push(write_var_file(&dir, variables).await?);
            let out = self
                .terraform(&dir, args, cancel, &[0])
                .await
                .context("terraform plan")?;

            Ok(PlanResult {
                changes: parse_plan_changes(&out.stdout),
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
            let dir = working_dir(component)?;
            self.init(&dir, cancel).await?;

            let mut args = strings(&["apply", "-auto-approve", "-input=false", "-no-color"]);
            args.push(write_var_file(&dir, variables).await?);
            self.terraform(&dir, args, cancel, &[0])
                .await
                .context("terraform apply")?;

            let outputs = self.outputs(&dir, cancel).await?;
            info!(component = %component.id, outputs = outputs.len(), "terraform apply finished");
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
            let dir = working_dir(component)?;
            self.init(&dir, cancel).await?;

            let mut args = strings(&["destroy", "-auto-approve", "-input=false", "-no-color"]);
            args.push(write_var_file(&dir, variables).await?);
            self.terraform(&dir, args, cancel, &[0])
                .await
                .context("terraform destroy")?;
            Ok(())
        })
    }

    fn status<'a>(
        &'a self,
        component: &'a Component,
        cancel: &'a CancellationToken,
    ) -> ProviderFuture<'a, HealthStatus> {
        Box::pin(async move {
            let dir = working_dir(component)?;
            let outputs = self.outputs(&dir, cancel).await?;
            Ok(HealthStatus::healthy(format!(
                "state readable, {} output(s)",
                outputs.len()
            )))
        })
    }
}

fn working_dir(component: &Component) -> Result<PathBuf> {
    let dir = PathBuf::from(&component.source);
    if !dir.is_dir() {
        bail!(
            "terraform source '{}' of component '{}' is not a directory",
            component.source,
            component.id
        );
    }
    Ok(dir)
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

fn render_var_file(variables: &Variables) -> Result<String> {
    serde_json::to_string_pretty(variables).context("rendering terraform variables")
}

/// Write `variables` to [`VAR_FILE`] in `dir` and return the flag that loads it.
async fn write_var_file(dir: &Path, variables: &Variables) -> Result<String> {
    let path = dir.join(VAR_FILE);
    tokio::fs::write(&path, render_var_file(variables)?)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(format!("-var-file={VAR_FILE}"))
}

#[derive(Deserialize)]
struct OutputValue {
    value: serde_json::Value,
}

/// Flatten `terraform output -json` into string values.
fn parse_outputs(json: &str) -> Result<BTreeMap<String, String>> {
    if json.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let raw: BTreeMap<String, OutputValue> =
        serde_json::from_str(json).context("parsing terraform output JSON")?;
    Ok(raw
        .into_iter()
        .map(|(name, out)| {
            let value = match out.value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (name, value)
        })
        .collect())
}

/// Collect `planned_change` messages from `terraform plan -json` output.
fn parse_plan_changes(stream: &str) -> Vec<Change> {
    stream
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .filter(|msg| msg["type"] == "planned_change")
        .filter_map(|msg| {
            let change = &msg["change"];
            Some(Change {
                action: change["action"].as_str()?.to_string(),
                address: change["resource"]["addr"].as_str()?.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variables_render_as_a_json_object() {
        let vars = Variables::from([
            ("env".to_string(), "prod".to_string()),
            ("namespace".to_string(), "shop".to_string()),
        ]);
        let rendered = render_var_file(&vars).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(doc, serde_json::json!({"env": "prod", "namespace": "shop"}));
    }

    #[tokio::test]
    async fn var_file_is_written_into_the_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let vars = Variables::from([("region".to_string(), "eu".to_string())]);

        let flag = write_var_file(dir.path(), &vars).await.unwrap();

        assert_eq!(flag, "-var-file=orchix.tfvars.json");
        let raw = std::fs::read_to_string(dir.path().join(VAR_FILE)).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["region"], "eu");

        write_var_file(dir.path(), &Variables::new()).await.unwrap();
        let raw = std::fs::read_to_string(dir.path().join(VAR_FILE)).unwrap();
        assert_eq!(raw.trim(), "{}");
    }

    #[test]
    fn outputs_are_flattened_to_strings() {
        let json = r#"{
            "endpoint": {"sensitive": false, "type": "string", "value": "db.internal"},
            "port": {"sensitive": false, "type": "number", "value": 5432},
            "zones": {"sensitive": false, "type": ["list", "string"], "value": ["a", "b"]}
        }"#;
        let outputs = parse_outputs(json).unwrap();
        assert_eq!(outputs["endpoint"], "db.internal");
        assert_eq!(outputs["port"], "5432");
        assert_eq!(outputs["zones"], r#"["a","b"]"#);
    }

    #[test]
    fn plan_stream_yields_planned_changes_only() {
        let stream = [
            r#"{"@level":"info","type":"version","terraform":"1.7.0"}"#,
            r#"{"@level":"info","type":"planned_change","change":{"resource":{"addr":"aws_db_instance.main"},"action":"create"}}"#,
            r#"not json at all"#,
            r#"{"@level":"info","type":"planned_change","change":{"resource":{"addr":"aws_sg.db"},"action":"update"}}"#,
            r#"{"@level":"info","type":"change_summary","changes":{"add":1,"change":1}}"#,
        ]
        .join("\n");

        assert_eq!(
            parse_plan_changes(&stream),
            vec![
                Change {
                    action: "create".to_string(),
                    address: "aws_db_instance.main".to_string()
                },
                Change {
                    action: "update".to_string(),
                    address: "aws_sg.db".to_string()
                },
            ]
        );
    }

    #[test]
    fn missing_source_directory_is_an_error() {
        let comp = Component {
            id: "db".to_string(),
            source: "/definitely/not/here".to_string(),
            ..Default::default()
        };
        assert!(working_dir(&comp).is_err());
    }
}
