// src/logging.rs

//! Logging setup for `orchix` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `ORCHIX_LOG` environment variable, any `EnvFilter` directive
//!    (e.g. "debug" or "orchix::exec=trace")
//! 3. default to `info`
//!
//! Logs are sent to STDERR so that stdout carries only command output.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "ORCHIX_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    fmt()
        .with_env_filter(build_filter(cli_level, std::env::var(LOG_ENV_VAR).ok()))
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>, env_value: Option<String>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level_directive(level));
    }
    env_value
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
