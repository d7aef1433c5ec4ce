//! Assembling a [`Config`] from the process environment

use super::{Config, ConfigOverrides, ConfigSources, PartialConfig, file};
use crate::auth::get_github_auth;
use crate::error::Result;
use crate::platform::parse_repo_info;
use crate::trigger::{CommandRunner, GitRunner};
use crate::types::PlatformConfig;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Set by GitHub Actions to `owner/repo`
pub const GITHUB_REPOSITORY_ENV: &str = "GITHUB_REPOSITORY";

const DETECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolve configuration for a run started in `cwd`
///
/// Layers the config file, environment, and `overrides`; fills owner/repo
/// from `GITHUB_REPOSITORY` or the git remote; finds a token; validates.
/// Makes no GitHub API calls and logs nothing, since logging is configured
/// from the result; [`Config::sources`] records where values came from.
pub async fn load_config(
    overrides: ConfigOverrides,
    config_path: Option<&Path>,
    cwd: &Path,
) -> Result<Config> {
    let (path, file_config) = file::discover(config_path, cwd)?;
    let mut sources = ConfigSources {
        file: path,
        ..ConfigSources::default()
    };

    let explicit_token = overrides.github_token.clone();
    let mut partial = PartialConfig::merge(file_config, overrides, |name| std::env::var(name).ok());
    partial.apply_ci_env(std::env::var(GITHUB_REPOSITORY_ENV).ok().as_deref());

    if partial.owner.is_none() || partial.repo.is_none() {
        let workdir = partial.workdir.clone().unwrap_or_else(|| cwd.to_path_buf());
        let workdir = if workdir.is_relative() {
            cwd.join(workdir)
        } else {
            workdir
        };
        let remote = partial
            .remote
            .clone()
            .unwrap_or_else(|| super::DEFAULT_REMOTE.to_string());
        if let Some(detected) = detect_repo(&GitRunner::new(), &workdir, &remote).await {
            apply_detected(&mut partial, detected);
            sources.detected_remote = Some(remote);
        }
    }

    if let Some(auth) = get_github_auth(explicit_token.as_deref()).await {
        sources.token = Some(auth.source);
        partial.token = Some(auth.token);
    }

    let mut config = Config::validate(partial)?;
    config.sources = sources;
    Ok(config)
}

/// Owner/repo/host parsed from the URL of `remote` in `dir`
pub async fn detect_repo(
    runner: &dyn CommandRunner,
    dir: &Path,
    remote: &str,
) -> Option<PlatformConfig> {
    let args = ["remote".to_string(), "get-url".to_string(), remote.to_string()];
    let output = runner
        .run(dir, &args, DETECT_TIMEOUT, &CancellationToken::new())
        .await
        .ok()
        .filter(|o| o.success())?;

    parse_repo_info(&output.stdout).ok()
}

/// Fill unset owner/repo/host from a detected remote
pub fn apply_detected(partial: &mut PartialConfig, detected: PlatformConfig) {
    if partial.owner.is_none() {
        partial.owner = Some(detected.owner);
    }
    if partial.repo.is_none() {
        partial.repo = Some(detected.repo);
    }
    if partial.host.is_none() {
        partial.host = detected.host;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthSource;
    use crate::trigger::{ProcessError, ProcessOutput};
    use async_trait::async_trait;

    struct RemoteUrl(&'static str, i32);

    #[async_trait]
    impl CommandRunner for RemoteUrl {
        async fn run(
            &self,
            _dir: &Path,
            args: &[String],
            _timeout: Duration,
            _cancel: &CancellationToken,
        ) -> std::result::Result<ProcessOutput, ProcessError> {
            assert_eq!(args.join(" "), "remote get-url upstream");
            Ok(ProcessOutput {
                code: Some(self.1),
                stdout: format!("{}\n", self.0),
                stderr: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_detects_from_remote_url() {
        let runner = RemoteUrl("git@ghe.example.com:acme/widgets.git", 0);
        let detected = detect_repo(&runner, Path::new("."), "upstream")
            .await
            .unwrap();
        assert_eq!(detected.owner, "acme");
        assert_eq!(detected.repo, "widgets");
        assert_eq!(detected.host.as_deref(), Some("ghe.example.com"));
    }

    #[tokio::test]
    async fn test_missing_remote_detects_nothing() {
        let runner = RemoteUrl("", 2);
        assert!(detect_repo(&runner, Path::new("."), "upstream").await.is_none());
    }

    #[tokio::test]
    async fn test_sources_record_file_and_flag_token() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join(".run-ci.yml");
        std::fs::write(&path, "base: main\n").unwrap();
        let overrides = ConfigOverrides {
            owner: Some("octo".to_string()),
            repo: Some("hello".to_string()),
            github_token: Some("t0ken".to_string()),
            ..ConfigOverrides::default()
        };

        let config = load_config(overrides, None, temp.path()).await.unwrap();

        assert_eq!(config.sources.file, Some(path));
        assert_eq!(config.sources.token, Some(AuthSource::Flag));
        assert_eq!(config.sources.detected_remote, None);
        assert!(!format!("{config:?}").contains("t0ken"));
    }

    #[test]
    fn test_detected_values_do_not_override() {
        let mut partial = PartialConfig {
            owner: Some("mine".to_string()),
            ..PartialConfig::default()
        };
        apply_detected(
            &mut partial,
            PlatformConfig {
                owner: "theirs".to_string(),
                repo: "repo".to_string(),
                host: None,
            },
        );
        assert_eq!(partial.owner.as_deref(), Some("mine"));
        assert_eq!(partial.repo.as_deref(), Some("repo"));
    }
}
