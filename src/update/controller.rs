//! Update run orchestration
//!
//! Lists candidate PRs, then for each one in API order: evaluate the filter,
//! check staleness, and trigger CI. Per-candidate failures are recorded and
//! the run moves on; only listing failures abort it.

use super::staleness::StalenessDetector;
use super::summary::{Action, FailureReason, OutcomeRecord, RunSummary};
use crate::error::{Error, Result};
use crate::expr::{EvalContext, Predicate};
use crate::platform::PlatformService;
use crate::trigger::Trigger;
use crate::types::{PullRequest, Selection};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Retry policy for rate-limited PR listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total listing attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound for the computed backoff
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt number `attempt` (1-based)
    ///
    /// Doubles from `initial_backoff` up to `max_backoff`. A server-provided
    /// `retry_after` wins when it is longer.
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let backoff = self
            .initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff);
        retry_after.map_or(backoff, |server| server.max(backoff))
    }
}

/// Knobs for a run
#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    /// Timeout for each GitHub API call
    pub api_timeout: Duration,
    /// Listing retry policy
    pub retry: RetryPolicy,
    /// Classify without pushing
    pub dry_run: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            api_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            dry_run: false,
        }
    }
}

/// Progress reporting during a run
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// Listing is about to start
    async fn on_listing(&self, selection: &Selection);

    /// Listing finished with `count` candidates
    async fn on_listed(&self, count: usize);

    /// A candidate finished processing
    async fn on_outcome(&self, record: &OutcomeRecord);
}

/// Progress callback that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

#[async_trait]
impl ProgressCallback for NoProgress {
    async fn on_listing(&self, _selection: &Selection) {}
    async fn on_listed(&self, _count: usize) {}
    async fn on_outcome(&self, _record: &OutcomeRecord) {}
}

/// Drives one update run
pub struct Controller<'a> {
    platform: &'a dyn PlatformService,
    trigger: &'a dyn Trigger,
    filter: Predicate,
    selection: Selection,
    options: ControllerOptions,
    cancel: CancellationToken,
}

impl<'a> Controller<'a> {
    /// Create a controller
    ///
    /// `filter` is compiled up front, so configuration errors never surface
    /// from [`Controller::run`].
    pub fn new(
        platform: &'a dyn PlatformService,
        trigger: &'a dyn Trigger,
        filter: Predicate,
        selection: Selection,
        options: ControllerOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            platform,
            trigger,
            filter,
            selection,
            options,
            cancel,
        }
    }

    /// Run to completion
    ///
    /// Returns `Err` only when listing fails or is cancelled. Every listed
    /// candidate processed before cancellation gets exactly one record.
    pub async fn run(&self, progress: &dyn ProgressCallback) -> Result<RunSummary> {
        let mut summary = RunSummary::start();

        progress.on_listing(&self.selection).await;
        let mut candidates = self.list_candidates().await?;
        dedup_by_number(&mut candidates);
        progress.on_listed(candidates.len()).await;
        info!(
            repo = %self.platform.config(),
            selection = %self.selection,
            count = candidates.len(),
            "listed open pull requests"
        );

        let detector = StalenessDetector::new(self.platform);
        let mut tips: HashMap<String, String> = HashMap::new();

        for (index, pr) in candidates.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(
                    remaining = candidates.len() - index,
                    "run cancelled; remaining pull requests not processed"
                );
                summary.interrupted = true;
                break;
            }

            let action = self.process(pr, &detector, &mut tips).await;
            summary.push(pr.number, &pr.head_ref, action);
            if let Some(record) = summary.outcomes.last() {
                progress.on_outcome(record).await;
            }
        }

        summary.finish();
        Ok(summary)
    }

    async fn process(
        &self,
        pr: &PullRequest,
        detector: &StalenessDetector<'_>,
        tips: &mut HashMap<String, String>,
    ) -> Action {
        let ctx = EvalContext::from_pull_request(pr);
        match self.filter.evaluate(&ctx) {
            Ok(true) => {}
            Ok(false) => {
                info!(pr_number = pr.number, "skipped by filter");
                return Action::SkippedByFilter;
            }
            Err(e) => {
                warn!(pr_number = pr.number, error = %e, "failed to evaluate filter");
                return Action::Failed(FailureReason::Evaluation(e));
            }
        }

        let stale = match self.check_staleness(pr, detector, tips).await {
            Ok(stale) => stale,
            Err(e) => {
                warn!(pr_number = pr.number, base_ref = %pr.base_ref, error = %e, "failed to check staleness");
                return Action::Failed(FailureReason::Staleness(e));
            }
        };
        if !stale {
            info!(pr_number = pr.number, base_ref = %pr.base_ref, "base is up to date");
            return Action::UpToDate;
        }

        if self.options.dry_run {
            info!(pr_number = pr.number, head_ref = %pr.head_ref, "base is stale; dry run, not pushing");
            return Action::WouldTrigger;
        }

        info!(pr_number = pr.number, head_ref = %pr.head_ref, "base is stale; pushing empty commit");
        match self.trigger.trigger(pr, &self.cancel).await {
            Ok(sha) => Action::Triggered { sha },
            Err(e) => {
                warn!(pr_number = pr.number, step = %e.step, error = %e, "failed to trigger CI");
                Action::Failed(FailureReason::Execution(e))
            }
        }
    }

    async fn check_staleness(
        &self,
        pr: &PullRequest,
        detector: &StalenessDetector<'_>,
        tips: &mut HashMap<String, String>,
    ) -> Result<bool> {
        let tip = match tips.get(&pr.base_ref) {
            Some(tip) => tip.clone(),
            None => {
                let tip = self
                    .api("get branch tip", self.platform.get_branch_tip(&pr.base_ref))
                    .await?;
                tips.insert(pr.base_ref.clone(), tip.clone());
                tip
            }
        };
        debug!(pr_number = pr.number, tip, recorded = %pr.base_sha, "comparing base");

        self.api("get merge base", detector.is_stale(&tip, &pr.base_sha))
            .await
    }

    async fn list_candidates(&self) -> Result<Vec<PullRequest>> {
        let base = self.selection.base_branch();
        let retry = self.options.retry;
        let mut attempt = 1;

        loop {
            let result = self
                .api("list pull requests", self.platform.list_pull_requests(base))
                .await;
            match result {
                Err(Error::RateLimited { retry_after }) if attempt < retry.max_attempts => {
                    let delay = retry.delay(attempt, retry_after);
                    warn!(attempt, ?delay, "rate limited while listing pull requests; retrying");
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = self.cancel.cancelled() => return Err(Error::Cancelled),
                    }
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Bound an API call by the per-call timeout and the run's cancellation
    async fn api<T>(&self, what: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        let timeout = self.options.api_timeout;
        tokio::select! {
            result = tokio::time::timeout(timeout, call) => match result {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(timeout, what.to_string())),
            },
            () = self.cancel.cancelled() => Err(Error::Cancelled),
        }
    }
}

/// Drop repeated PR numbers, keeping the first occurrence
///
/// Pages can shift while PRs open or close mid-listing, so the same PR may
/// be returned twice.
fn dedup_by_number(candidates: &mut Vec<PullRequest>) {
    let mut seen = HashSet::new();
    candidates.retain(|pr| {
        let first = seen.insert(pr.number);
        if !first {
            debug!(pr_number = pr.number, "dropping duplicate listing entry");
        }
        first
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(10),
        };
        assert_eq!(policy.delay(1, None), Duration::from_secs(2));
        assert_eq!(policy.delay(2, None), Duration::from_secs(4));
        assert_eq!(policy.delay(3, None), Duration::from_secs(8));
        assert_eq!(policy.delay(4, None), Duration::from_secs(10));
        assert_eq!(policy.delay(40, None), Duration::from_secs(10));
    }

    #[test]
    fn test_retry_after_wins_when_longer() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay(1, Some(Duration::from_secs(30))),
            Duration::from_secs(30)
        );
        assert_eq!(
            policy.delay(3, Some(Duration::from_secs(1))),
            Duration::from_secs(8)
        );
    }
}
