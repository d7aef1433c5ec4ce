//! GitHub token discovery

use super::AuthSource;
use tokio::process::Command;
use tracing::debug;

/// Environment variables checked for a token, in priority order
pub const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GITHUB_ACCESS_TOKEN"];

/// A resolved GitHub token and where it came from
#[derive(Clone)]
pub struct GitHubAuthConfig {
    /// The access token
    pub token: String,
    /// Where the token was found
    pub source: AuthSource,
}

impl std::fmt::Debug for GitHubAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubAuthConfig")
            .field("token", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// First non-empty token from [`TOKEN_ENV_VARS`]
pub fn token_from_env() -> Option<String> {
    TOKEN_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// Resolve a GitHub token
///
/// Priority: explicit token, environment variables, then `gh auth token`.
/// Returns `None` when nothing yields a token; a missing or failing `gh`
/// binary is not an error.
pub async fn get_github_auth(explicit: Option<&str>) -> Option<GitHubAuthConfig> {
    if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return Some(GitHubAuthConfig {
            token: token.to_string(),
            source: AuthSource::Flag,
        });
    }

    if let Some(token) = token_from_env() {
        return Some(GitHubAuthConfig {
            token,
            source: AuthSource::EnvVar,
        });
    }

    let output = match Command::new("gh").args(["auth", "token"]).output().await {
        Ok(output) => output,
        Err(e) => {
            debug!(error = %e, "gh CLI not available");
            return None;
        }
    };
    if !output.status.success() {
        debug!(status = %output.status, "gh auth token failed");
        return None;
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!token.is_empty()).then_some(GitHubAuthConfig {
        token,
        source: AuthSource::Cli,
    })
}
