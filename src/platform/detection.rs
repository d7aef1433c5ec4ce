//! Repository detection from git remote URLs

use crate::error::{ConfigError, Error, Result};
use crate::types::PlatformConfig;
use url::Url;

const GITHUB_HOST: &str = "github.com";

/// Parse owner/repo (and custom host) from a git remote URL
///
/// Accepts `https://host/owner/repo(.git)`, `ssh://git@host/owner/repo.git`
/// and scp-like `git@host:owner/repo.git`.
pub fn parse_repo_info(remote_url: &str) -> Result<PlatformConfig> {
    let trimmed = remote_url.trim();

    let (host, path) = if let Some((user_host, path)) = scp_like(trimmed) {
        let host = user_host.rsplit('@').next().unwrap_or(user_host);
        (host.to_string(), path.to_string())
    } else {
        let url = Url::parse(trimmed).map_err(|e| invalid(trimmed, &e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| invalid(trimmed, "missing host"))?
            .to_string();
        (host, url.path().to_string())
    };

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut parts = path.rsplitn(2, '/');
    let repo = parts.next().filter(|s| !s.is_empty());
    let owner = parts.next().filter(|s| !s.is_empty());

    let (Some(owner), Some(repo)) = (owner, repo) else {
        return Err(invalid(trimmed, "expected <owner>/<repo> in path"));
    };

    Ok(PlatformConfig {
        owner: owner.to_string(),
        repo: repo.to_string(),
        host: (host != GITHUB_HOST).then_some(host),
    })
}

/// Split `user@host:path`, rejecting anything with a URL scheme
fn scp_like(s: &str) -> Option<(&str, &str)> {
    if s.contains("://") {
        return None;
    }
    s.split_once(':')
}

fn invalid(url: &str, reason: &str) -> Error {
    Error::Config(ConfigError::File {
        path: format!("remote {url}"),
        message: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_url() {
        let info = parse_repo_info("https://github.com/suzuki-shunsuke/run-ci.git").unwrap();
        assert_eq!(info.owner, "suzuki-shunsuke");
        assert_eq!(info.repo, "run-ci");
        assert_eq!(info.host, None);
    }

    #[test]
    fn test_scp_like_url() {
        let info = parse_repo_info("git@github.com:octo/hello.git").unwrap();
        assert_eq!(info.owner, "octo");
        assert_eq!(info.repo, "hello");
        assert_eq!(info.host, None);
    }

    #[test]
    fn test_ssh_url_with_enterprise_host() {
        let info = parse_repo_info("ssh://git@ghe.example.com/team/service").unwrap();
        assert_eq!(info.owner, "team");
        assert_eq!(info.repo, "service");
        assert_eq!(info.host.as_deref(), Some("ghe.example.com"));
    }

    #[test]
    fn test_missing_repo_is_error() {
        assert!(parse_repo_info("https://github.com/only-owner").is_err());
        assert!(parse_repo_info("not a url").is_err());
    }
}
