//! Empty-commit trigger backed by a local git working copy

use super::{CommandRunner, ExecutionError, GitRunner, GitStep, ProcessError, Trigger};
use crate::types::{GitIdentity, PullRequest};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Prefix of the temporary local branch used while triggering
const TEMP_BRANCH_PREFIX: &str = "run-ci/pr-";

/// Pushes an empty commit to a PR's head branch
///
/// The sequence runs in `workdir`, which must be a clone with `remote`
/// configured. The working copy is restored to its previous checkout after
/// every attempt, successful or not. Only one trigger runs at a time per
/// working copy.
pub struct GitTrigger<R: CommandRunner = GitRunner> {
    runner: R,
    workdir: Mutex<PathBuf>,
    remote: String,
    identity: GitIdentity,
    message: String,
    timeout: Duration,
}

impl<R: CommandRunner> GitTrigger<R> {
    /// Create a trigger
    ///
    /// `timeout` bounds each individual git invocation.
    pub fn new(
        runner: R,
        workdir: PathBuf,
        remote: String,
        identity: GitIdentity,
        message: String,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            workdir: Mutex::new(workdir),
            remote,
            identity,
            message,
            timeout,
        }
    }

    /// Local branch the head is fetched into for PR `number`
    pub fn temp_branch(number: u64) -> String {
        format!("{TEMP_BRANCH_PREFIX}{number}")
    }

    /// Full message of the empty commit for PR `number`
    pub fn commit_message(&self, number: u64) -> String {
        format!("{}\n\nTriggered for #{number}", self.message)
    }

    /// Run one git step, returning trimmed stdout
    async fn step(
        &self,
        dir: &Path,
        step: GitStep,
        args: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<String, ExecutionError> {
        let output = self
            .runner
            .run(dir, &args, self.timeout, cancel)
            .await
            .map_err(|source| ExecutionError { step, source })?;

        if !output.success() {
            return Err(ExecutionError {
                step,
                source: ProcessError::Exit {
                    code: output.code,
                    stderr: output.stderr,
                },
            });
        }
        Ok(output.stdout.trim().to_string())
    }

    /// Branch name, or commit SHA when HEAD is detached
    async fn current_checkout(
        &self,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<String, ExecutionError> {
        let symbolic = self
            .runner
            .run(
                dir,
                &args(["symbolic-ref", "--quiet", "--short", "HEAD"]),
                self.timeout,
                cancel,
            )
            .await
            .map_err(|source| ExecutionError {
                step: GitStep::Prepare,
                source,
            })?;

        let branch = symbolic.stdout.trim();
        if symbolic.success() && !branch.is_empty() {
            return Ok(branch.to_string());
        }

        self.step(dir, GitStep::Prepare, args(["rev-parse", "HEAD"]), cancel)
            .await
    }

    /// Refuse to run over uncommitted changes to tracked files
    ///
    /// `checkout` carries the index along, so a staged file would end up in
    /// the pushed commit.
    async fn ensure_clean(
        &self,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), ExecutionError> {
        let status = self
            .step(
                dir,
                GitStep::Prepare,
                args(["status", "--porcelain", "--untracked-files=no"]),
                cancel,
            )
            .await?;
        if status.is_empty() {
            return Ok(());
        }

        let files = status
            .lines()
            .filter_map(|line| line.split_whitespace().last())
            .collect::<Vec<_>>()
            .join(", ");
        Err(ExecutionError {
            step: GitStep::Prepare,
            source: ProcessError::Dirty(files),
        })
    }

    /// Checkout, commit, and push; expects the temporary branch to exist
    async fn commit_and_push(
        &self,
        dir: &Path,
        pr: &PullRequest,
        temp: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ExecutionError> {
        self.step(
            dir,
            GitStep::Checkout,
            args(["checkout", "--quiet", temp]),
            cancel,
        )
        .await?;

        let commit = vec![
            "-c".to_string(),
            format!("user.name={}", self.identity.name),
            "-c".to_string(),
            format!("user.email={}", self.identity.email),
            "-c".to_string(),
            "commit.gpgsign=false".to_string(),
            "commit".to_string(),
            "--allow-empty".to_string(),
            "--no-verify".to_string(),
            "-m".to_string(),
            self.commit_message(pr.number),
        ];
        self.step(dir, GitStep::Commit, commit, cancel).await?;

        let sha = self
            .step(dir, GitStep::RevParse, args(["rev-parse", "HEAD"]), cancel)
            .await?;

        let refspec = format!("HEAD:refs/heads/{}", pr.head_ref);
        self.step(
            dir,
            GitStep::Push,
            args(["push", self.remote.as_str(), refspec.as_str()]),
            cancel,
        )
        .await?;

        Ok(sha)
    }

    /// Return to `original` and delete `temp`
    ///
    /// Uses its own token so an interrupted run still restores the working
    /// copy. Failures are logged, not returned.
    async fn cleanup(&self, dir: &Path, original: &str, temp: &str) {
        let token = CancellationToken::new();

        let restore = self
            .step(
                dir,
                GitStep::Checkout,
                args(["checkout", "--quiet", original]),
                &token,
            )
            .await;
        if let Err(e) = restore {
            warn!(original, error = %e, "failed to restore previous checkout");
            return;
        }

        let delete = self
            .step(dir, GitStep::Checkout, args(["branch", "-D", temp]), &token)
            .await;
        if let Err(e) = delete {
            warn!(branch = temp, error = %e, "failed to delete temporary branch");
        }
    }
}

fn args<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(ToString::to_string).collect()
}

#[async_trait]
impl<R: CommandRunner> Trigger for GitTrigger<R> {
    async fn trigger(
        &self,
        pr: &PullRequest,
        cancel: &CancellationToken,
    ) -> Result<String, ExecutionError> {
        let dir = self.workdir.lock().await;
        let temp = Self::temp_branch(pr.number);

        let original = self.current_checkout(&dir, cancel).await?;
        debug!(pr_number = pr.number, original, "saved current checkout");
        self.ensure_clean(&dir, cancel).await?;

        let refspec = format!("+refs/heads/{}:refs/heads/{temp}", pr.head_ref);
        self.step(
            &dir,
            GitStep::Fetch,
            args(["fetch", "--no-tags", self.remote.as_str(), refspec.as_str()]),
            cancel,
        )
        .await?;

        let result = self.commit_and_push(&dir, pr, &temp, cancel).await;
        self.cleanup(&dir, &original, &temp).await;

        if let Ok(sha) = &result {
            info!(pr_number = pr.number, head_ref = %pr.head_ref, sha, "pushed empty commit");
        }
        result
    }
}
