//! Triggering CI by pushing an empty commit
//!
//! The [`Trigger`] trait is what the update run calls for every stale PR.
//! [`GitTrigger`] implements it with a fetch/checkout/commit/push sequence
//! against a local working copy.

mod git;
mod runner;

pub use git::GitTrigger;
pub use runner::{CommandRunner, GitRunner, ProcessOutput};

use crate::types::PullRequest;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// One git invocation in the trigger sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitStep {
    /// Remember the current checkout
    Prepare,
    /// Fetch the head branch into a temporary local branch
    Fetch,
    /// Check out the temporary branch
    Checkout,
    /// Create the empty commit
    Commit,
    /// Read the new commit SHA
    RevParse,
    /// Push to the head branch
    Push,
}

impl std::fmt::Display for GitStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prepare => write!(f, "prepare"),
            Self::Fetch => write!(f, "fetch"),
            Self::Checkout => write!(f, "checkout"),
            Self::Commit => write!(f, "commit"),
            Self::RevParse => write!(f, "rev-parse"),
            Self::Push => write!(f, "push"),
        }
    }
}

/// Failure of a single subprocess
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProcessError {
    /// Process could not be started or waited on
    #[error("failed to run git: {0}")]
    Spawn(String),

    /// Process exited unsuccessfully
    #[error("exited with {}: {}", exit_label(*code), stderr.trim())]
    Exit {
        /// Exit code, `None` when killed by a signal
        code: Option<i32>,
        /// Captured stderr
        stderr: String,
    },

    /// Step exceeded its timeout
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Run was cancelled while the step was running
    #[error("cancelled")]
    Cancelled,

    /// Working copy has staged or modified tracked files
    #[error("working copy has uncommitted changes: {0}")]
    Dirty(String),
}

fn exit_label(code: Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| format!("status {c}"))
}

/// A trigger failed at `step`
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("git {step} failed: {source}")]
pub struct ExecutionError {
    /// Failing step
    pub step: GitStep,
    /// Underlying process failure
    #[source]
    pub source: ProcessError,
}

/// Makes the CI provider see a new commit on a PR's head branch
#[async_trait]
pub trait Trigger: Send + Sync {
    /// Push a new commit to `pr.head_ref`, returning its SHA
    async fn trigger(
        &self,
        pr: &PullRequest,
        cancel: &CancellationToken,
    ) -> Result<String, ExecutionError>;
}
