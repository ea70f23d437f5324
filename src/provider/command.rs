// src/provider/command.rs

//! Cancellable external command runner shared by CLI-backed providers.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Error out with stderr attached unless the exit code is in `accepted`.
    pub fn ensure_code(self, program: &str, accepted: &[i32]) -> Result<Self> {
        if accepted.contains(&self.code) {
            return Ok(self);
        }
        let stderr = self.stderr.trim();
        bail!(
            "`{}` exited with code {}{}",
            program,
            self.code,
            if stderr.is_empty() {
                String::new()
            } else {
                format!(": {stderr}")
            }
        )
    }
}

/// Spawn `program args...` in `dir` and wait for it.
///
/// If `cancel` fires first the child is killed and an error is returned.
/// Non-zero exit codes are not errors here; callers decide via
/// [`CommandOutput::ensure_code`].
pub async fn run_command(
    program: &str,
    args: &[String],
    dir: Option<&Path>,
    cancel: &CancellationToken,
) -> Result<CommandOutput> {
    debug!(%program, ?args, ?dir, "spawning command");

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }

    let child = cmd
        .spawn()
        .with_context(|| format!("spawning `{program}`"))?;

    tokio::select! {
        output = child.wait_with_output() => {
            let output = output.with_context(|| format!("waiting for `{program}`"))?;
            let code = output.status.code().unwrap_or(-1);
            info!(%program, exit_code = code, "command exited");
            Ok(CommandOutput {
                code,
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }

        _ = cancel.cancelled() => {
            // Dropping the wait future drops the child, which kills it.
            warn!(%program, "cancellation requested; killing command");
            bail!("`{program}` cancelled")
        }
    }
}
