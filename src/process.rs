//! Execution of `claude` command vectors as child processes.
//!
//! Vectors are passed to [`tokio::process::Command`] argument by argument;
//! no shell is involved at any point. A run is bounded by a timeout, after
//! which the child is killed and [`QuickstartError::ProcessTimeout`] is
//! returned. Dropping the future (e.g. on Ctrl-C) also kills the child.

use crate::command::CommandVector;
use crate::constants::{CLAUDE_PROGRAM, default_process_timeout};
use crate::core::QuickstartError;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

/// Captured result of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Something that can execute a [`CommandVector`].
///
/// The setup flow is generic over this so tests can record invocations
/// instead of spawning processes.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run `command` to completion.
    ///
    /// # Errors
    ///
    /// [`QuickstartError::ProcessTimeout`] or [`QuickstartError::ProcessFailed`],
    /// or an I/O error if the program cannot be spawned.
    async fn run(&self, command: &CommandVector) -> Result<ProcessOutput>;
}

/// Runs command vectors with tokio.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    timeout: Duration,
}

impl Default for ProcessInvoker {
    fn default() -> Self {
        Self::new(default_process_timeout())
    }
}

impl ProcessInvoker {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Find the `claude` executable on PATH.
    ///
    /// # Errors
    ///
    /// [`QuickstartError::ClaudeNotFound`] when it is not installed.
    pub fn locate() -> Result<PathBuf, QuickstartError> {
        which::which(CLAUDE_PROGRAM).map_err(|_| QuickstartError::ClaudeNotFound)
    }

    /// Whether `program` resolves on PATH.
    #[must_use]
    pub fn is_available(program: &str) -> bool {
        which::which(program).is_ok()
    }
}

impl CommandRunner for ProcessInvoker {
    async fn run(&self, command: &CommandVector) -> Result<ProcessOutput> {
        let start = Instant::now();
        let shown = command.redacted();
        tracing::debug!(target: "process", "Executing command: {shown}");

        let mut cmd = Command::new(command.program());
        cmd.args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().with_context(|| format!("Failed to start: {shown}"))?;

        // On timeout the output future is dropped, and with it the child,
        // which kill_on_drop terminates.
        let Ok(result) = timeout(self.timeout, child.wait_with_output()).await else {
            tracing::warn!(
                target: "process",
                "Command timed out after {} seconds: {shown}",
                self.timeout.as_secs()
            );
            return Err(QuickstartError::ProcessTimeout {
                command: shown,
                seconds: self.timeout.as_secs(),
            }
            .into());
        };
        let output = result.with_context(|| format!("Failed to wait for: {shown}"))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::debug!(
                target: "process",
                "Command failed with exit code: {:?}",
                output.status.code()
            );
            if !stderr.is_empty() {
                tracing::debug!(target: "process", "Error: {}", stderr.trim());
            }
            return Err(QuickstartError::ProcessFailed {
                command: shown,
                code: output.status.code(),
                stderr: if stderr.trim().is_empty() {
                    stdout.trim().to_string()
                } else {
                    stderr.trim().to_string()
                },
            }
            .into());
        }

        if !stdout.trim().is_empty() {
            tracing::debug!(target: "process", "{}", stdout.trim());
        }
        tracing::debug!(
            target: "process",
            "Command finished in {}ms",
            start.elapsed().as_millis()
        );

        Ok(ProcessOutput { stdout, stderr })
    }
}
