//! Platform services for GitHub
//!
//! Provides the repository operations the update run needs: listing open
//! PRs, reading branch tips, and resolving merge bases.

mod detection;
mod github;

pub use detection::parse_repo_info;
pub use github::GitHubService;

use crate::error::Result;
use crate::types::{PlatformConfig, PullRequest};
use async_trait::async_trait;

/// Platform service trait for the operations run-ci depends on
///
/// Implementations own pagination and field mapping. Callers treat the PR
/// list as a finite sequence in the order the platform returned it.
#[async_trait]
pub trait PlatformService: Send + Sync {
    /// List open PRs, optionally only those targeting `base`
    async fn list_pull_requests(&self, base: Option<&str>) -> Result<Vec<PullRequest>>;

    /// Current tip commit of a branch
    async fn get_branch_tip(&self, branch: &str) -> Result<String>;

    /// Merge base of two commits
    ///
    /// Returns `None` when the platform reports no common history between
    /// them (for example after a force-push rewrote one side).
    async fn get_merge_base(&self, a: &str, b: &str) -> Result<Option<String>>;

    /// Get the platform configuration
    fn config(&self) -> &PlatformConfig;
}

/// Create the platform service for `config`
pub fn create_platform_service(
    config: &PlatformConfig,
    token: &str,
) -> Result<Box<dyn PlatformService>> {
    let service = GitHubService::new(
        token,
        config.owner.clone(),
        config.repo.clone(),
        config.host.clone(),
    )?;
    Ok(Box::new(service))
}
