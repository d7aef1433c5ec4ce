//! Layered configuration
//!
//! Values are resolved with the precedence flags > environment > config
//! file > defaults. Owner and repo may additionally come from the
//! `GITHUB_REPOSITORY` variable that GitHub Actions sets, or from the git
//! remote of the working copy. Validation happens before any network access.

pub mod file;
mod load;

pub use file::{CONFIG_FILE_NAME, FileConfig};
pub use load::{GITHUB_REPOSITORY_ENV, apply_detected, detect_repo, load_config};

use crate::auth::AuthSource;
use crate::error::ConfigError;
use crate::expr::Predicate;
use crate::types::{GitIdentity, Selection};
use crate::update::RetryPolicy;
use std::path::PathBuf;
use std::time::Duration;

/// Default message of the triggering empty commit
pub const DEFAULT_COMMIT_MESSAGE: &str = "[run-ci] empty commit to run CI";
/// Default committer name
pub const DEFAULT_USER_NAME: &str = "run-ci";
/// Default committer email
pub const DEFAULT_USER_EMAIL: &str = "run-ci@users.noreply.github.com";
/// Default remote
pub const DEFAULT_REMOTE: &str = "origin";
/// Environment variable for the log level
pub const LOG_LEVEL_ENV: &str = "RUN_CI_LOG_LEVEL";

const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
const DEFAULT_GIT_TIMEOUT_SECS: u64 = 120;

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// `--owner`
    pub owner: Option<String>,
    /// `--repo`
    pub repo: Option<String>,
    /// `--github-token`
    pub github_token: Option<String>,
    /// `--base`
    pub base: Option<String>,
    /// `--all`
    pub all: bool,
    /// `--expr`
    pub expr: Option<String>,
    /// `--log-level`
    pub log_level: Option<String>,
    /// `--workdir`
    pub workdir: Option<PathBuf>,
    /// `--remote`
    pub remote: Option<String>,
    /// `--dry-run`
    pub dry_run: bool,
    /// `--timeout` (whole run, seconds)
    pub timeout_secs: Option<u64>,
}

/// Merged but not yet validated configuration
#[derive(Debug, Clone, Default)]
pub struct PartialConfig {
    /// Repository owner
    pub owner: Option<String>,
    /// Repository name
    pub repo: Option<String>,
    /// GitHub Enterprise host
    pub host: Option<String>,
    /// Access token
    pub token: Option<String>,
    /// Base branch selection
    pub base: Option<String>,
    /// Select all open PRs
    pub all: bool,
    /// Filter expression
    pub expr: Option<String>,
    /// Empty commit message
    pub empty_commit_message: Option<String>,
    /// Log level
    pub log_level: Option<String>,
    /// Committer name
    pub user_name: Option<String>,
    /// Committer email
    pub user_email: Option<String>,
    /// Git remote
    pub remote: Option<String>,
    /// Working copy
    pub workdir: Option<PathBuf>,
    /// Per API call timeout
    pub api_timeout_secs: Option<u64>,
    /// Per git step timeout
    pub git_timeout_secs: Option<u64>,
    /// Whole-run deadline, 0 disables
    pub run_timeout_secs: Option<u64>,
    /// Listing attempts
    pub max_attempts: Option<u32>,
    /// First backoff delay
    pub initial_backoff_secs: Option<u64>,
    /// Dry run
    pub dry_run: bool,
}

impl PartialConfig {
    /// Merge file, environment, and flag layers
    ///
    /// `env` looks up an environment variable; tests pass a closure over a
    /// fixed map. The token is resolved separately (see [`crate::auth`]).
    pub fn merge(
        file: FileConfig,
        overrides: ConfigOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let env_log_level = env(LOG_LEVEL_ENV).filter(|v| !v.trim().is_empty());

        Self {
            owner: overrides.owner.or(file.owner),
            repo: overrides.repo.or(file.repo),
            host: file.github.host,
            token: overrides.github_token,
            base: overrides.base.or(file.base).filter(|b| !b.is_empty()),
            all: overrides.all || file.all.unwrap_or(false),
            expr: overrides.expr.or(file.expr),
            empty_commit_message: file.empty_commit_message,
            log_level: overrides.log_level.or(env_log_level).or(file.log_level),
            user_name: file.git.user_name,
            user_email: file.git.user_email,
            remote: overrides.remote.or(file.git.remote),
            workdir: overrides.workdir.or(file.git.workdir),
            api_timeout_secs: file.timeouts.api_secs,
            git_timeout_secs: file.timeouts.git_secs,
            run_timeout_secs: overrides.timeout_secs.or(file.timeouts.run_secs),
            max_attempts: file.retry.max_attempts,
            initial_backoff_secs: file.retry.initial_backoff_secs,
            dry_run: overrides.dry_run,
        }
    }

    /// Fill owner/repo from `GITHUB_REPOSITORY` (`owner/repo`) when unset
    pub fn apply_ci_env(&mut self, github_repository: Option<&str>) {
        let Some((owner, repo)) = github_repository.and_then(|v| v.trim().split_once('/')) else {
            return;
        };
        if self.owner.is_none() && !owner.is_empty() {
            self.owner = Some(owner.to_string());
        }
        if self.repo.is_none() && !repo.is_empty() {
            self.repo = Some(repo.to_string());
        }
    }
}

/// Where resolved values came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSources {
    /// Config file that was read
    pub file: Option<PathBuf>,
    /// Where the token came from
    pub token: Option<AuthSource>,
    /// Remote whose URL supplied owner or repo
    pub detected_remote: Option<String>,
}

/// Fully resolved, validated configuration
#[derive(Clone)]
pub struct Config {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// GitHub Enterprise host
    pub host: Option<String>,
    /// Access token
    pub token: String,
    /// Which PRs to consider
    pub selection: Selection,
    /// Compiled filter
    pub filter: Predicate,
    /// Committer identity for the empty commit
    pub identity: GitIdentity,
    /// Message of the empty commit
    pub empty_commit_message: String,
    /// Git remote
    pub remote: String,
    /// Working copy
    pub workdir: PathBuf,
    /// Log level, if configured
    pub log_level: Option<tracing::Level>,
    /// Per API call timeout
    pub api_timeout: Duration,
    /// Per git step timeout
    pub git_timeout: Duration,
    /// Whole-run deadline
    pub run_timeout: Option<Duration>,
    /// Listing retry policy
    pub retry: RetryPolicy,
    /// Evaluate and detect without pushing
    pub dry_run: bool,
    /// Provenance, filled in by [`load_config`]
    pub sources: ConfigSources,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("host", &self.host)
            .field("token", &"<redacted>")
            .field("selection", &self.selection)
            .field("expr", &self.filter.source())
            .field("identity", &self.identity)
            .field("empty_commit_message", &self.empty_commit_message)
            .field("remote", &self.remote)
            .field("workdir", &self.workdir)
            .field("log_level", &self.log_level)
            .field("api_timeout", &self.api_timeout)
            .field("git_timeout", &self.git_timeout)
            .field("run_timeout", &self.run_timeout)
            .field("retry", &self.retry)
            .field("dry_run", &self.dry_run)
            .field("sources", &self.sources)
            .finish()
    }
}

impl Config {
    /// Validate a merged configuration
    ///
    /// Checks required fields, the base/all selection, the log level, and
    /// compiles the filter expression.
    pub fn validate(partial: PartialConfig) -> Result<Self, ConfigError> {
        let owner = non_empty(partial.owner).ok_or(ConfigError::OwnerRequired)?;
        let repo = non_empty(partial.repo).ok_or(ConfigError::RepoRequired)?;
        let token = non_empty(partial.token).ok_or(ConfigError::TokenRequired)?;

        let selection = match (partial.base, partial.all) {
            (Some(_), true) => return Err(ConfigError::ConflictingSelection),
            (Some(base), false) => Selection::Base(base),
            (None, true) => Selection::All,
            (None, false) => return Err(ConfigError::SelectionRequired),
        };

        let log_level = non_empty(partial.log_level)
            .map(|level| {
                level
                    .trim()
                    .parse::<tracing::Level>()
                    .map_err(|_| ConfigError::InvalidLogLevel(level.clone()))
            })
            .transpose()?;

        let filter = Predicate::compile(partial.expr.as_deref().unwrap_or_default())?;

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: partial.max_attempts.unwrap_or(defaults.max_attempts).max(1),
            initial_backoff: partial
                .initial_backoff_secs
                .map_or(defaults.initial_backoff, Duration::from_secs),
            ..defaults
        };

        Ok(Self {
            owner,
            repo,
            host: non_empty(partial.host),
            token,
            selection,
            filter,
            identity: GitIdentity {
                name: non_empty(partial.user_name).unwrap_or_else(|| DEFAULT_USER_NAME.to_string()),
                email: non_empty(partial.user_email)
                    .unwrap_or_else(|| DEFAULT_USER_EMAIL.to_string()),
            },
            empty_commit_message: non_empty(partial.empty_commit_message)
                .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_string()),
            remote: non_empty(partial.remote).unwrap_or_else(|| DEFAULT_REMOTE.to_string()),
            workdir: partial.workdir.unwrap_or_else(|| PathBuf::from(".")),
            log_level,
            api_timeout: Duration::from_secs(
                partial.api_timeout_secs.unwrap_or(DEFAULT_API_TIMEOUT_SECS),
            ),
            git_timeout: Duration::from_secs(
                partial.git_timeout_secs.unwrap_or(DEFAULT_GIT_TIMEOUT_SECS),
            ),
            run_timeout: partial
                .run_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            retry,
            dry_run: partial.dry_run,
            sources: ConfigSources::default(),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn complete() -> PartialConfig {
        PartialConfig {
            owner: Some("octo".into()),
            repo: Some("hello".into()),
            token: Some("t0ken".into()),
            base: Some("main".into()),
            ..PartialConfig::default()
        }
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::validate(complete()).unwrap();
        assert_eq!(config.selection, Selection::Base("main".into()));
        assert!(config.filter.is_always());
        assert_eq!(config.remote, "origin");
        assert_eq!(config.identity.name, DEFAULT_USER_NAME);
        assert_eq!(config.empty_commit_message, DEFAULT_COMMIT_MESSAGE);
        assert_eq!(config.api_timeout, Duration::from_secs(30));
        assert_eq!(config.run_timeout, None);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_both_base_and_all_rejected() {
        let partial = PartialConfig {
            all: true,
            ..complete()
        };
        assert!(matches!(
            Config::validate(partial),
            Err(ConfigError::ConflictingSelection)
        ));
    }

    #[test]
    fn test_neither_base_nor_all_rejected() {
        let partial = PartialConfig {
            base: None,
            ..complete()
        };
        assert!(matches!(
            Config::validate(partial),
            Err(ConfigError::SelectionRequired)
        ));
    }

    #[test]
    fn test_all_selection() {
        let partial = PartialConfig {
            base: None,
            all: true,
            ..complete()
        };
        assert_eq!(Config::validate(partial).unwrap().selection, Selection::All);
    }

    #[test]
    fn test_required_fields() {
        let no_owner = PartialConfig {
            owner: None,
            ..complete()
        };
        assert!(matches!(
            Config::validate(no_owner),
            Err(ConfigError::OwnerRequired)
        ));

        let blank_repo = PartialConfig {
            repo: Some("  ".into()),
            ..complete()
        };
        assert!(matches!(
            Config::validate(blank_repo),
            Err(ConfigError::RepoRequired)
        ));

        let no_token = PartialConfig {
            token: None,
            ..complete()
        };
        assert!(matches!(
            Config::validate(no_token),
            Err(ConfigError::TokenRequired)
        ));
    }

    #[test]
    fn test_bad_expression_is_config_error() {
        let partial = PartialConfig {
            expr: Some("draft ==".into()),
            ..complete()
        };
        assert!(matches!(
            Config::validate(partial),
            Err(ConfigError::Expression(_))
        ));
    }

    #[test]
    fn test_bad_log_level() {
        let partial = PartialConfig {
            log_level: Some("loud".into()),
            ..complete()
        };
        assert!(matches!(
            Config::validate(partial),
            Err(ConfigError::InvalidLogLevel(level)) if level == "loud"
        ));
    }

    #[test]
    fn test_precedence_flag_over_env_over_file() {
        let file: FileConfig = toml::from_str(
            r#"
            owner = "file-owner"
            repo = "file-repo"
            base = "develop"
            log_level = "warn"
            [git]
            remote = "upstream"
            "#,
        )
        .unwrap();
        let overrides = ConfigOverrides {
            owner: Some("flag-owner".into()),
            ..ConfigOverrides::default()
        };
        let env: HashMap<&str, &str> = [(LOG_LEVEL_ENV, "debug")].into_iter().collect();

        let merged = PartialConfig::merge(file, overrides, |k| env.get(k).map(ToString::to_string));
        assert_eq!(merged.owner.as_deref(), Some("flag-owner"));
        assert_eq!(merged.repo.as_deref(), Some("file-repo"));
        assert_eq!(merged.base.as_deref(), Some("develop"));
        assert_eq!(merged.log_level.as_deref(), Some("debug"));
        assert_eq!(merged.remote.as_deref(), Some("upstream"));
    }

    #[test]
    fn test_all_flag_combines_with_file_base() {
        // `--all` on the command line with `base` in the file is still a conflict.
        let file = FileConfig {
            base: Some("main".into()),
            ..FileConfig::default()
        };
        let overrides = ConfigOverrides {
            all: true,
            ..ConfigOverrides::default()
        };
        let merged = PartialConfig::merge(file, overrides, |_| None);
        assert!(merged.all);
        assert_eq!(merged.base.as_deref(), Some("main"));
    }

    #[test]
    fn test_ci_env_fills_only_missing_coordinates() {
        let mut partial = PartialConfig {
            owner: Some("explicit".into()),
            ..PartialConfig::default()
        };
        partial.apply_ci_env(Some("actions-owner/actions-repo"));
        assert_eq!(partial.owner.as_deref(), Some("explicit"));
        assert_eq!(partial.repo.as_deref(), Some("actions-repo"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = Config::validate(complete()).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("t0ken"));
        assert!(rendered.contains("<redacted>"));
    }
}
