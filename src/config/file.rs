//! Config file discovery, loading, and the `init` template
//!
//! `.run-ci.toml` is what `init` writes. `.run-ci.yml` and `.run-ci.yaml`
//! are read with the same schema.

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// File name written by `init`
pub const CONFIG_FILE_NAME: &str = ".run-ci.toml";

/// Names looked for in each directory, in order
pub const CONFIG_FILE_NAMES: [&str; 3] = [CONFIG_FILE_NAME, ".run-ci.yml", ".run-ci.yaml"];

/// Contents written by `run-ci init`
pub const CONFIG_TEMPLATE: &str = r#"# run-ci configuration
# Flags and environment variables override values in this file.

# owner = "my-org"
# repo = "my-repo"

# Select PRs by base branch, or set `all = true` for every open PR.
base = "main"
# all = true

# Only PRs for which this expression is true are considered.
# Fields: number, title, draft, author, labels, base, head, base_sha, head_sha
expr = "draft == false"

empty_commit_message = "[run-ci] empty commit to run CI"
# log_level = "info"

[git]
# user_name = "run-ci"
# user_email = "run-ci@users.noreply.github.com"
# remote = "origin"
# workdir = "."

# [github]
# host = "github.example.com"

# [timeouts]
# api_secs = 30
# git_secs = 120
# run_secs = 0

# [retry]
# max_attempts = 5
# initial_backoff_secs = 2
"#;

/// Raw config file contents; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Repository owner
    pub owner: Option<String>,
    /// Repository name
    pub repo: Option<String>,
    /// Base branch selection
    pub base: Option<String>,
    /// Select all open PRs
    pub all: Option<bool>,
    /// Filter expression
    pub expr: Option<String>,
    /// Message of the empty commit
    #[serde(alias = "empty_commit_msg")]
    pub empty_commit_message: Option<String>,
    /// Log level
    pub log_level: Option<String>,
    /// `[git]` table
    #[serde(default, alias = "git_command")]
    pub git: GitSection,
    /// `[github]` table
    #[serde(default)]
    pub github: GitHubSection,
    /// `[timeouts]` table
    #[serde(default)]
    pub timeouts: TimeoutSection,
    /// `[retry]` table
    #[serde(default)]
    pub retry: RetrySection,
}

/// `[git]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitSection {
    /// Committer name for the empty commit
    pub user_name: Option<String>,
    /// Committer email for the empty commit
    pub user_email: Option<String>,
    /// Remote to fetch from and push to
    pub remote: Option<String>,
    /// Working copy used for triggering
    pub workdir: Option<PathBuf>,
}

/// `[github]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitHubSection {
    /// GitHub Enterprise host
    pub host: Option<String>,
}

/// `[timeouts]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutSection {
    /// Per API call
    pub api_secs: Option<u64>,
    /// Per git step
    pub git_secs: Option<u64>,
    /// Whole run; 0 disables
    pub run_secs: Option<u64>,
}

/// `[retry]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    /// Listing attempts under rate limiting
    pub max_attempts: Option<u32>,
    /// First backoff delay
    pub initial_backoff_secs: Option<u64>,
}

/// Load a config file from an explicit path
pub fn load_from_path(path: &Path) -> std::result::Result<FileConfig, ConfigError> {
    let file_error = |message: String| ConfigError::File {
        path: path.display().to_string(),
        message,
    };
    let content = fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
    if is_yaml(path) {
        // An empty YAML document is an empty config, not an error
        if content.trim().is_empty() {
            return Ok(FileConfig::default());
        }
        serde_yaml::from_str(&content).map_err(|e| file_error(e.to_string()))
    } else {
        toml::from_str(&content).map_err(|e| file_error(e.to_string()))
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"))
}

/// Find the config file to use
///
/// An explicit path must exist. Otherwise the first of [`CONFIG_FILE_NAMES`]
/// found walking up from `start`, then the per-user config file.
pub fn find_config_file(explicit: Option<&Path>, start: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    start
        .ancestors()
        .find_map(existing_config)
        .or_else(|| user_config_path().filter(|p| p.is_file()))
}

fn existing_config(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// `<config dir>/run-ci/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("run-ci").join("config.toml"))
}

/// Discover and load configuration, returning the path that was used
pub fn discover(
    explicit: Option<&Path>,
    start: &Path,
) -> std::result::Result<(Option<PathBuf>, FileConfig), ConfigError> {
    match find_config_file(explicit, start) {
        Some(path) => {
            let config = load_from_path(&path)?;
            Ok((Some(path), config))
        }
        None => Ok((None, FileConfig::default())),
    }
}

/// Write [`CONFIG_TEMPLATE`] into `dir` unless a config file already exists
///
/// Returns the created path, or `None` if one was already there.
pub fn write_template(dir: &Path) -> Result<Option<PathBuf>> {
    if existing_config(dir).is_some() {
        return Ok(None);
    }
    let path = dir.join(CONFIG_FILE_NAME);
    fs::write(&path, CONFIG_TEMPLATE)?;
    Ok(Some(path))
}
