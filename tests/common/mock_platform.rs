//! Mock platform service and trigger for testing
//!
//! These are test utilities - not all may be used in current tests but are
//! available for future test development.

#![allow(dead_code)]

use async_trait::async_trait;
use run_ci::error::{Error, Result};
use run_ci::platform::PlatformService;
use run_ci::trigger::{ExecutionError, GitStep, ProcessError, Trigger};
use run_ci::types::{PlatformConfig, PullRequest};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Simple mock platform service for testing
///
/// This manually implements `PlatformService` rather than using mockall,
/// because mockall has issues with methods returning references.
///
/// Features:
/// - Fixed PR list returned in insertion order
/// - Configurable branch tips and merge bases
/// - Call tracking for verification
/// - Error injection for failure path testing
pub struct MockPlatformService {
    config: PlatformConfig,
    prs: Mutex<Vec<PullRequest>>,
    tips: Mutex<HashMap<String, String>>,
    merge_bases: Mutex<HashMap<(String, String), Option<String>>>,
    // Call tracking
    list_calls: Mutex<Vec<Option<String>>>,
    tip_calls: Mutex<Vec<String>>,
    merge_base_calls: Mutex<Vec<(String, String)>>,
    // Error injection
    error_on_list: Mutex<Option<String>>,
    rate_limits_before_list: AtomicU32,
    error_on_tip: Mutex<HashMap<String, String>>,
    list_delay: Mutex<Option<Duration>>,
}

impl MockPlatformService {
    /// Create a new mock with the given config
    pub fn with_config(config: PlatformConfig) -> Self {
        Self {
            config,
            prs: Mutex::new(Vec::new()),
            tips: Mutex::new(HashMap::new()),
            merge_bases: Mutex::new(HashMap::new()),
            list_calls: Mutex::new(Vec::new()),
            tip_calls: Mutex::new(Vec::new()),
            merge_base_calls: Mutex::new(Vec::new()),
            error_on_list: Mutex::new(None),
            rate_limits_before_list: AtomicU32::new(0),
            error_on_tip: Mutex::new(HashMap::new()),
            list_delay: Mutex::new(None),
        }
    }

    // === Response setup ===

    /// Add an open PR to the listing
    pub fn add_pr(&self, pr: PullRequest) {
        self.prs.lock().unwrap().push(pr);
    }

    /// Set the tip of `branch`
    pub fn set_tip(&self, branch: &str, sha: &str) {
        self.tips
            .lock()
            .unwrap()
            .insert(branch.to_string(), sha.to_string());
    }

    /// Set the merge base reported for `(a, b)`
    pub fn set_merge_base(&self, a: &str, b: &str, merge_base: Option<&str>) {
        self.merge_bases.lock().unwrap().insert(
            (a.to_string(), b.to_string()),
            merge_base.map(ToString::to_string),
        );
    }

    /// `recorded` is an ancestor of `tip`
    pub fn set_behind(&self, tip: &str, recorded: &str) {
        self.set_merge_base(tip, recorded, Some(recorded));
    }

    // === Error injection methods ===

    /// Make `list_pull_requests` return an API error
    pub fn fail_list(&self, msg: &str) {
        *self.error_on_list.lock().unwrap() = Some(msg.to_string());
    }

    /// Make the next `times` listings fail with a rate limit
    pub fn rate_limit_list(&self, times: u32) {
        self.rate_limits_before_list.store(times, Ordering::SeqCst);
    }

    /// Make `get_branch_tip` fail for `branch`
    pub fn fail_tip(&self, branch: &str, msg: &str) {
        self.error_on_tip
            .lock()
            .unwrap()
            .insert(branch.to_string(), msg.to_string());
    }

    /// Delay every listing by `delay`
    pub fn delay_list(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = Some(delay);
    }

    // === Call verification methods ===

    /// Base filters passed to `list_pull_requests`
    pub fn get_list_calls(&self) -> Vec<Option<String>> {
        self.list_calls.lock().unwrap().clone()
    }

    /// Branches passed to `get_branch_tip`
    pub fn get_tip_calls(&self) -> Vec<String> {
        self.tip_calls.lock().unwrap().clone()
    }

    /// Pairs passed to `get_merge_base`
    pub fn get_merge_base_calls(&self) -> Vec<(String, String)> {
        self.merge_base_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformService for MockPlatformService {
    async fn list_pull_requests(&self, base: Option<&str>) -> Result<Vec<PullRequest>> {
        self.list_calls
            .lock()
            .unwrap()
            .push(base.map(ToString::to_string));

        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let limited = self
            .rate_limits_before_list
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if limited {
            return Err(Error::RateLimited {
                retry_after: Some(Duration::from_millis(1)),
            });
        }

        if let Some(msg) = self.error_on_list.lock().unwrap().clone() {
            return Err(Error::GitHubApi(msg));
        }

        Ok(self
            .prs
            .lock()
            .unwrap()
            .iter()
            .filter(|pr| base.is_none_or(|b| pr.base_ref == b))
            .cloned()
            .collect())
    }

    async fn get_branch_tip(&self, branch: &str) -> Result<String> {
        self.tip_calls.lock().unwrap().push(branch.to_string());
        if let Some(msg) = self.error_on_tip.lock().unwrap().get(branch) {
            return Err(Error::GitHubApi(msg.clone()));
        }
        self.tips
            .lock()
            .unwrap()
            .get(branch)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("branch {branch}")))
    }

    async fn get_merge_base(&self, a: &str, b: &str) -> Result<Option<String>> {
        self.merge_base_calls
            .lock()
            .unwrap()
            .push((a.to_string(), b.to_string()));
        Ok(self
            .merge_bases
            .lock()
            .unwrap()
            .get(&(a.to_string(), b.to_string()))
            .cloned()
            .flatten())
    }

    fn config(&self) -> &PlatformConfig {
        &self.config
    }
}

/// Spy trigger recording which PRs were triggered
pub struct MockTrigger {
    calls: Mutex<Vec<u64>>,
    failures: Mutex<HashMap<u64, String>>,
    cancel_on: Mutex<Option<u64>>,
}

impl MockTrigger {
    /// Trigger that succeeds for every PR
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            cancel_on: Mutex::new(None),
        }
    }

    /// Make the push for PR `number` fail with `stderr`
    pub fn fail_push(&self, number: u64, stderr: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(number, stderr.to_string());
    }

    /// Cancel the run while triggering PR `number`
    pub fn cancel_during(&self, number: u64) {
        *self.cancel_on.lock().unwrap() = Some(number);
    }

    /// PR numbers triggered, in order
    pub fn get_calls(&self) -> Vec<u64> {
        self.calls.lock().unwrap().clone()
    }

    /// SHA the mock reports for PR `number`
    pub fn sha_for(number: u64) -> String {
        format!("{number:0>40}")
    }
}

impl Default for MockTrigger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Trigger for MockTrigger {
    async fn trigger(
        &self,
        pr: &PullRequest,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, ExecutionError> {
        self.calls.lock().unwrap().push(pr.number);

        if *self.cancel_on.lock().unwrap() == Some(pr.number) {
            cancel.cancel();
        }

        if let Some(stderr) = self.failures.lock().unwrap().get(&pr.number) {
            return Err(ExecutionError {
                step: GitStep::Push,
                source: ProcessError::Exit {
                    code: Some(128),
                    stderr: stderr.clone(),
                },
            });
        }
        Ok(Self::sha_for(pr.number))
    }
}
