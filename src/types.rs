//! Core types for run-ci

use serde::{Deserialize, Serialize};

/// An open pull request considered for a CI re-run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// Web URL for the PR
    pub html_url: String,
    /// PR title
    pub title: String,
    /// Head branch name
    pub head_ref: String,
    /// Head commit SHA
    pub head_sha: String,
    /// Base branch name
    pub base_ref: String,
    /// Base commit SHA as recorded by GitHub at the last sync of the PR
    pub base_sha: String,
    /// Login of the PR author
    pub author: String,
    /// Label names
    pub labels: Vec<String>,
    /// Whether PR is a draft
    pub is_draft: bool,
}

/// Platform configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Custom host (None for github.com)
    pub host: Option<String>,
}

impl std::fmt::Display for PlatformConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.host {
            Some(host) => write!(f, "{host}/{}/{}", self.owner, self.repo),
            None => write!(f, "{}/{}", self.owner, self.repo),
        }
    }
}

/// Which pull requests a run considers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Open PRs targeting this base branch
    Base(String),
    /// Every open PR in the repository
    All,
}

impl Selection {
    /// Base branch filter to pass to the PR listing, if any
    pub fn base_branch(&self) -> Option<&str> {
        match self {
            Self::Base(branch) => Some(branch),
            Self::All => None,
        }
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Base(branch) => write!(f, "base={branch}"),
            Self::All => write!(f, "all"),
        }
    }
}

/// Committer identity used for the empty commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitIdentity {
    /// `user.name`
    pub name: String,
    /// `user.email`
    pub email: String,
}
