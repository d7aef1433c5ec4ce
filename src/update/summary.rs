//! Per-PR outcomes and the run summary

use crate::error::Error;
use crate::expr::EvalError;
use crate::trigger::ExecutionError;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Why a candidate failed
#[derive(Debug, Error)]
pub enum FailureReason {
    /// Filter expression could not be evaluated for this PR
    #[error("expression evaluation failed: {0}")]
    Evaluation(#[source] EvalError),

    /// Base tip or merge base could not be resolved
    #[error("staleness check failed: {0}")]
    Staleness(#[source] Error),

    /// Pushing the empty commit failed
    #[error("{0}")]
    Execution(#[source] ExecutionError),
}

/// What happened to one candidate
#[derive(Debug)]
pub enum Action {
    /// Filter expression evaluated to false
    SkippedByFilter,
    /// Base has not advanced since the PR was last synced
    UpToDate,
    /// Empty commit pushed
    Triggered {
        /// SHA of the new head commit
        sha: String,
    },
    /// Stale, but the run is a dry run
    WouldTrigger,
    /// Processing failed
    Failed(FailureReason),
}

impl Action {
    /// Short label used in the summary
    pub const fn label(&self) -> &'static str {
        match self {
            Self::SkippedByFilter => "skipped",
            Self::UpToDate => "up-to-date",
            Self::Triggered { .. } => "triggered",
            Self::WouldTrigger => "would trigger",
            Self::Failed(_) => "failed",
        }
    }

    /// Whether this outcome fails the run
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Triggered { sha } => write!(f, "{} {}", self.label(), short_sha(sha)),
            Self::Failed(reason) => write!(f, "{}: {reason}", self.label()),
            _ => f.write_str(self.label()),
        }
    }
}

/// First seven characters of a commit SHA
pub fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

/// Outcome for one candidate PR
#[derive(Debug)]
pub struct OutcomeRecord {
    /// PR number
    pub number: u64,
    /// Head branch
    pub head_ref: String,
    /// What happened
    pub action: Action,
}

impl fmt::Display for OutcomeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}  {}", self.number, self.head_ref, self.action)
    }
}

/// Number of outcomes of each kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    /// `Triggered`
    pub triggered: usize,
    /// `WouldTrigger`
    pub would_trigger: usize,
    /// `UpToDate`
    pub up_to_date: usize,
    /// `SkippedByFilter`
    pub skipped: usize,
    /// `Failed`
    pub failed: usize,
}

impl fmt::Display for OutcomeCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} triggered, ", self.triggered)?;
        if self.would_trigger > 0 {
            write!(f, "{} would trigger, ", self.would_trigger)?;
        }
        write!(
            f,
            "{} up-to-date, {} skipped, {} failed",
            self.up_to_date, self.skipped, self.failed
        )
    }
}

/// Result of one update run, in processing order
#[derive(Debug)]
pub struct RunSummary {
    /// One record per processed candidate
    pub outcomes: Vec<OutcomeRecord>,
    /// Cancelled before every candidate was processed
    pub interrupted: bool,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// Empty summary starting now
    pub fn start() -> Self {
        let now = Utc::now();
        Self {
            outcomes: Vec::new(),
            interrupted: false,
            started_at: now,
            finished_at: now,
        }
    }

    /// Record an outcome
    pub fn push(&mut self, number: u64, head_ref: &str, action: Action) {
        self.outcomes.push(OutcomeRecord {
            number,
            head_ref: head_ref.to_string(),
            action,
        });
    }

    /// Stamp the finish time
    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    /// Tally outcomes by kind
    pub fn counts(&self) -> OutcomeCounts {
        self.outcomes
            .iter()
            .fold(OutcomeCounts::default(), |mut counts, record| {
                match record.action {
                    Action::SkippedByFilter => counts.skipped += 1,
                    Action::UpToDate => counts.up_to_date += 1,
                    Action::Triggered { .. } => counts.triggered += 1,
                    Action::WouldTrigger => counts.would_trigger += 1,
                    Action::Failed(_) => counts.failed += 1,
                }
                counts
            })
    }

    /// No failed outcome and not interrupted
    pub fn is_success(&self) -> bool {
        !self.interrupted && !self.outcomes.iter().any(|r| r.action.is_failure())
    }

    /// Record for PR `number`, if it was processed
    pub fn outcome(&self, number: u64) -> Option<&OutcomeRecord> {
        self.outcomes.iter().find(|r| r.number == number)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.outcomes {
            writeln!(f, "{record}")?;
        }
        write!(f, "{}", self.counts())?;
        if self.interrupted {
            write!(f, " (interrupted)")?;
        }
        Ok(())
    }
}
