//! Shared test helpers

#![allow(dead_code)]

pub mod mock_platform;

pub use mock_platform::{MockPlatformService, MockTrigger};

use run_ci::types::{PlatformConfig, PullRequest};

/// Platform config for `test/repo` on github.com
pub fn github_config() -> PlatformConfig {
    PlatformConfig {
        owner: "test".to_string(),
        repo: "repo".to_string(),
        host: None,
    }
}

/// Open, non-draft PR against `main` recorded at `base_sha`
pub fn make_pr(number: u64, head: &str, base_sha: &str) -> PullRequest {
    PullRequest {
        number,
        html_url: format!("https://github.com/test/repo/pull/{number}"),
        title: format!("PR {number}"),
        head_ref: head.to_string(),
        head_sha: format!("head-{number}"),
        base_ref: "main".to_string(),
        base_sha: base_sha.to_string(),
        author: "octocat".to_string(),
        labels: vec![],
        is_draft: false,
    }
}

/// Same as [`make_pr`] but a draft
pub fn make_draft_pr(number: u64, head: &str, base_sha: &str) -> PullRequest {
    PullRequest {
        is_draft: true,
        ..make_pr(number, head, base_sha)
    }
}
