//! GitHub platform service implementation

use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::types::{PlatformConfig, PullRequest};
use async_trait::async_trait;
use chrono::Utc;
use octocrab::Octocrab;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const DEFAULT_API_BASE: &str = "https://api.github.com";

#[derive(Deserialize)]
struct BranchResponse {
    commit: CommitRef,
}

#[derive(Deserialize)]
struct CompareResponse {
    merge_base_commit: CommitRef,
}

#[derive(Deserialize)]
struct CommitRef {
    sha: String,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// GitHub service using octocrab
pub struct GitHubService {
    client: Octocrab,
    config: PlatformConfig,
    /// Token for raw HTTP requests (branches, compare)
    token: String,
    /// HTTP client for raw requests
    http_client: Client,
    /// API base URL without trailing slash
    api_base: String,
}

impl GitHubService {
    /// Create a new GitHub service
    ///
    /// `host` selects a GitHub Enterprise server; `None` means github.com.
    pub fn new(token: &str, owner: String, repo: String, host: Option<String>) -> Result<Self> {
        let api_base = host
            .as_ref()
            .map_or_else(|| DEFAULT_API_BASE.to_string(), |h| format!("https://{h}/api/v3"));
        Self::with_api_base(token, owner, repo, host, &api_base)
    }

    /// Create a service talking to an explicit API base URL
    pub fn with_api_base(
        token: &str,
        owner: String,
        repo: String,
        host: Option<String>,
        api_base: &str,
    ) -> Result<Self> {
        let api_base = api_base.trim_end_matches('/').to_string();

        let client = Octocrab::builder()
            .personal_token(token.to_string())
            .base_uri(api_base.as_str())
            .map_err(|e| Error::GitHubApi(e.to_string()))?
            .build()
            .map_err(|e| Error::GitHubApi(e.to_string()))?;

        let http_client = Client::builder()
            .user_agent("run-ci")
            .build()
            .map_err(|e| Error::GitHubApi(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: PlatformConfig { owner, repo, host },
            token: token.to_string(),
            http_client,
            api_base,
        })
    }

    /// GET a repository-scoped REST path and decode the JSON body
    ///
    /// Returns `Ok(None)` on 404 so callers can decide what "missing" means.
    async fn get_repo_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.config.owner, self.config.repo, path
        );

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await
            .map_err(|e| Error::GitHubApi(format!("request to {path} failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let headers = response.headers().clone();
            let body: ErrorBody = response.json().await.unwrap_or_default();
            return Err(error_for_status(status, &headers, body.message));
        }

        let value = response
            .json()
            .await
            .map_err(|e| Error::GitHubApi(format!("Failed to parse {path} response: {e}")))?;
        Ok(Some(value))
    }
}

/// Map a non-success REST status to an error kind
///
/// GitHub signals rate limiting with 429, or with 403 plus an exhausted
/// `x-ratelimit-remaining`; other 401/403 responses are credential problems.
fn error_for_status(status: StatusCode, headers: &HeaderMap, message: String) -> Error {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let exhausted = header("x-ratelimit-remaining") == Some("0");

    match status {
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited {
            retry_after: retry_after(headers),
        },
        StatusCode::FORBIDDEN if exhausted || header("retry-after").is_some() => {
            Error::RateLimited {
                retry_after: retry_after(headers),
            }
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth(message),
        StatusCode::NOT_FOUND => Error::NotFound(message),
        _ => Error::GitHubApi(format!("{status}: {message}")),
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
    };

    if let Some(secs) = header("retry-after") {
        return u64::try_from(secs).ok().map(Duration::from_secs);
    }
    let reset = header("x-ratelimit-reset")?;
    let wait = reset - Utc::now().timestamp();
    u64::try_from(wait.max(0)).ok().map(Duration::from_secs)
}

/// Helper to convert octocrab PR to our `PullRequest` type
fn pr_from_octocrab(pr: &octocrab::models::pulls::PullRequest) -> PullRequest {
    PullRequest {
        number: pr.number,
        html_url: pr
            .html_url
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        title: pr.title.as_deref().unwrap_or_default().to_string(),
        head_ref: pr.head.ref_field.clone(),
        head_sha: pr.head.sha.clone(),
        base_ref: pr.base.ref_field.clone(),
        base_sha: pr.base.sha.clone(),
        author: pr
            .user
            .as_ref()
            .map(|u| u.login.clone())
            .unwrap_or_default(),
        labels: pr
            .labels
            .as_ref()
            .map(|labels| labels.iter().map(|l| l.name.clone()).collect())
            .unwrap_or_default(),
        is_draft: pr.draft.unwrap_or(false),
    }
}

#[async_trait]
impl PlatformService for GitHubService {
    async fn list_pull_requests(&self, base: Option<&str>) -> Result<Vec<PullRequest>> {
        debug!(base = ?base, "listing open PRs");
        let pulls = self.client.pulls(&self.config.owner, &self.config.repo);
        let mut builder = pulls
            .list()
            .state(octocrab::params::State::Open)
            .per_page(100u8);
        if let Some(base) = base {
            builder = builder.base(base);
        }

        let first_page = builder.send().await?;
        let prs = self.client.all_pages(first_page).await?;

        let result: Vec<PullRequest> = prs.iter().map(pr_from_octocrab).collect();
        debug!(count = result.len(), "listed open PRs");
        Ok(result)
    }

    async fn get_branch_tip(&self, branch: &str) -> Result<String> {
        debug!(branch, "getting branch tip");
        let path = format!("branches/{}", urlencoding::encode(branch));
        let response: BranchResponse = self
            .get_repo_json(&path)
            .await?
            .ok_or_else(|| Error::NotFound(format!("branch {branch}")))?;
        debug!(branch, sha = %response.commit.sha, "got branch tip");
        Ok(response.commit.sha)
    }

    async fn get_merge_base(&self, a: &str, b: &str) -> Result<Option<String>> {
        debug!(a, b, "resolving merge base");
        let path = format!(
            "compare/{}...{}",
            urlencoding::encode(a),
            urlencoding::encode(b)
        );
        let merge_base = self
            .get_repo_json::<CompareResponse>(&path)
            .await?
            .map(|c| c.merge_base_commit.sha);
        debug!(a, b, merge_base = ?merge_base, "resolved merge base");
        Ok(merge_base)
    }

    fn config(&self) -> &PlatformConfig {
        &self.config
    }
}
