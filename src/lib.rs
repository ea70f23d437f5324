// src/lib.rs

pub mod cli;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod manifest;
pub mod provider;
pub mod state;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{CliArgs, Command};
use crate::engine::report::{render_preview, render_status, render_summary};
use crate::engine::{DeployOutcome, Engine};
use crate::manifest::load_and_validate;
use crate::provider::{KubernetesProvider, ProviderRegistry, TerraformProvider};
use crate::state::StateStore;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - manifest loading and validation
/// - provider registry and state store
/// - the engine
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let manifest = load_and_validate(&args.manifest)?;
    info!(
        manifest = %args.manifest.display(),
        app = %manifest.app_name,
        components = manifest.components.len(),
        "manifest loaded"
    );

    let registry = Arc::new(default_registry(&args));
    let store = Arc::new(StateStore::open(args.state_file.clone())?);
    let engine = Engine::new(manifest, registry, store)?;

    // Ctrl-C → cancel the in-flight run.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("interrupt received; cancelling");
            cancel.cancel();
        });
    }

    match args.command {
        Command::Deploy { dry_run } => match engine.deploy(dry_run, &cancel).await? {
            DeployOutcome::DryRun(plan) => print!("{plan}"),
            DeployOutcome::Applied(summary) => print!("{}", render_summary(&summary)),
        },
        Command::Destroy => {
            let summary = engine.destroy(&cancel).await?;
            print!("{}", render_summary(&summary));
        }
        Command::Status => print!("{}", render_status(&engine.status())),
        Command::Plan => {
            let previews = engine.preview(&cancel).await?;
            print!("{}", render_preview(&previews));
        }
    }

    Ok(())
}

/// Registry with the built-in CLI-backed providers.
fn default_registry(args: &CliArgs) -> ProviderRegistry {
    ProviderRegistry::new()
        .with(
            "terraform",
            Arc::new(TerraformProvider::new(args.terraform_bin.clone())),
        )
        .with(
            "kubernetes",
            Arc::new(KubernetesProvider::new(
                args.kubectl_bin.clone(),
                args.kubeconfig.clone(),
            )),
        )
}
