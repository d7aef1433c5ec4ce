//! Subprocess runner for git
//!
//! [`CommandRunner`] is the seam between the trigger sequence and the
//! operating system. [`GitRunner`] spawns real `git` processes; tests swap
//! in fakes that record arguments and inject failures.

use super::ProcessError;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code (`None` if killed by a signal)
    pub code: Option<i32>,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl ProcessOutput {
    /// Whether the process exited with status zero
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Runs a version-control command in a working directory
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `args` in `dir`
    ///
    /// A non-zero exit is reported through [`ProcessOutput::code`], not as an
    /// error. Errors are reserved for spawn failures, timeouts, and
    /// cancellation.
    async fn run(
        &self,
        dir: &Path,
        args: &[String],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, ProcessError>;
}

/// Runs the `git` binary
#[derive(Debug, Clone)]
pub struct GitRunner {
    program: String,
}

impl GitRunner {
    /// Runner for `git` on `PATH`
    pub fn new() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

impl Default for GitRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for GitRunner {
    async fn run(
        &self,
        dir: &Path,
        args: &[String],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, ProcessError> {
        if cancel.is_cancelled() {
            return Err(ProcessError::Cancelled);
        }
        trace!(dir = %dir.display(), ?args, "running git");

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| ProcessError::Spawn(e.to_string()))?;

        // Dropping the `wait_with_output` future kills the child.
        let output = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ProcessError::Cancelled),
            result = tokio::time::timeout(timeout, child.wait_with_output()) => match result {
                Ok(output) => output.map_err(|e| ProcessError::Spawn(e.to_string()))?,
                Err(_) => return Err(ProcessError::Timeout(timeout)),
            },
        };

        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
