// src/engine/report.rs

//! Values returned by the engine and their plain-text renderings.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::exec::RunSummary;
use crate::provider::Change;
use crate::types::ComponentStatus;

/// Result of [`Engine::deploy`](super::Engine::deploy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// Dry run: the rendered plan. No provider was called, no state written.
    DryRun(String),
    Applied(RunSummary),
}

/// One row of [`Engine::status`](super::Engine::status).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub id: String,
    /// Display name from the manifest, or the id for components that are
    /// recorded in state but no longer in the manifest.
    pub name: String,
    pub status: ComponentStatus,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
}

/// Provider preview for one component, see [`Engine::preview`](super::Engine::preview).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentPreview {
    /// 1-based stage number.
    pub stage: usize,
    pub id: String,
    pub name: String,
    pub provider: String,
    pub changes: Vec<Change>,
}

pub fn render_status(entries: &[StatusEntry]) -> String {
    if entries.is_empty() {
        return "No components recorded.\n".to_string();
    }

    let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for entry in entries {
        let _ = write!(
            out,
            "{:<width$}  {:<9}  {}",
            entry.name,
            entry.status.to_string(),
            entry.timestamp.to_rfc3339()
        );
        if let Some(ref err) = entry.error {
            let _ = write!(out, "  ({err})");
        }
        out.push('\n');
    }
    out
}

pub fn render_preview(previews: &[ComponentPreview]) -> String {
    let mut out = String::new();
    let mut current_stage = 0;
    for preview in previews {
        if preview.stage != current_stage {
            current_stage = preview.stage;
            let _ = writeln!(out, "Stage {current_stage}:");
        }
        let _ = writeln!(
            out,
            "  - {} [{}] via {}: {} change(s)",
            preview.name,
            preview.id,
            preview.provider,
            preview.changes.len()
        );
        for change in &preview.changes {
            let _ = writeln!(out, "      {} {}", change.action, change.address);
        }
    }
    out
}

pub fn render_summary(summary: &RunSummary) -> String {
    format!(
        "{} finished: {} component(s) in {} stage(s)\n",
        summary.operation,
        summary.component_count(),
        summary.stages.len()
    )
}
