// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::state::DEFAULT_STATE_PATH;

/// Command-line arguments for `orchix`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "orchix",
    version,
    about = "Deploy interdependent components in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the deployment manifest (YAML, or TOML with a `.toml` extension).
    #[arg(long, value_name = "PATH", default_value = "orchix.yaml", global = true)]
    pub manifest: PathBuf,

    /// Path to the JSON state file.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_STATE_PATH, global = true)]
    pub state_file: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ORCHIX_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Terraform executable used by the `terraform` provider.
    #[arg(long, value_name = "BIN", default_value = "terraform", global = true)]
    pub terraform_bin: String,

    /// kubectl executable used by the `kubernetes` provider.
    #[arg(long, value_name = "BIN", default_value = "kubectl", global = true)]
    pub kubectl_bin: String,

    /// Kubeconfig passed to every kubectl invocation.
    #[arg(long, value_name = "PATH", global = true)]
    pub kubeconfig: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Deploy all components in dependency order.
    Deploy {
        /// Print the execution plan without calling any provider.
        #[arg(long)]
        dry_run: bool,
    },
    /// Destroy all components, dependents first.
    Destroy,
    /// Show the recorded state of each component.
    Status,
    /// Ask each provider what a deploy would change.
    Plan,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
