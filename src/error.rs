//! Error types for run-ci

use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration problems detected before any network or git access
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No repository owner from flags, env, file, or detection
    #[error("owner is required")]
    OwnerRequired,

    /// No repository name from flags, env, file, or detection
    #[error("repo is required")]
    RepoRequired,

    /// No GitHub access token found
    #[error("GitHub Access Token is required (set --github-token, GITHUB_TOKEN or GITHUB_ACCESS_TOKEN)")]
    TokenRequired,

    /// Neither `base` nor `all` was given
    #[error("either the option 'base' or 'all' should be set")]
    SelectionRequired,

    /// Both `base` and `all` were given
    #[error("both the option 'base' and 'all' can't be set at the same time")]
    ConflictingSelection,

    /// The filter expression failed to compile
    #[error("failed to compile the expression, please check it: {0}")]
    Expression(#[from] crate::expr::CompileError),

    /// Log level string could not be parsed
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    /// Config file could not be read or parsed
    #[error("config file {path}: {message}")]
    File {
        /// Path of the offending file
        path: String,
        /// What went wrong
        message: String,
    },
}

/// Errors that can occur in run-ci
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or incomplete configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Authentication or authorization rejected by GitHub
    #[error("GitHub authentication failed: {0}")]
    Auth(String),

    /// Resource (branch, commit, repository) not found
    #[error("not found: {0}")]
    NotFound(String),

    /// GitHub rate limit hit
    #[error("GitHub rate limit exceeded")]
    RateLimited {
        /// Server-provided wait before retrying, if any
        retry_after: Option<Duration>,
    },

    /// Any other GitHub API failure
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// An external call exceeded its timeout
    #[error("timed out after {0:?}: {1}")]
    Timeout(Duration, String),

    /// The run was cancelled (interrupt or overall deadline)
    #[error("cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the listing step may retry after this error
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

impl From<octocrab::Error> for Error {
    fn from(err: octocrab::Error) -> Self {
        match &err {
            octocrab::Error::GitHub { source, .. } => {
                let message = source.message.clone();
                match source.status_code.as_u16() {
                    401 => Self::Auth(message),
                    403 | 429 if message.to_lowercase().contains("rate limit") => {
                        Self::RateLimited { retry_after: None }
                    }
                    429 => Self::RateLimited { retry_after: None },
                    403 => Self::Auth(message),
                    404 => Self::NotFound(message),
                    _ => Self::GitHubApi(message),
                }
            }
            _ => Self::GitHubApi(err.to_string()),
        }
    }
}
