//! Shared command context for the update command
//!
//! Resolves configuration and builds the services a run needs.

use run_ci::config::{Config, ConfigOverrides, load_config};
use run_ci::error::Result;
use run_ci::platform::{PlatformService, create_platform_service};
use run_ci::trigger::{GitRunner, GitTrigger};
use run_ci::types::PlatformConfig;
use std::path::Path;

/// Everything an update run needs, built once at startup
///
/// Construction validates configuration and creates clients but performs
/// no network access.
pub struct CommandContext {
    /// Resolved configuration
    pub config: Config,
    /// GitHub service
    pub platform: Box<dyn PlatformService>,
    /// Empty-commit trigger over the configured working copy
    pub trigger: GitTrigger,
}

impl CommandContext {
    /// Resolve configuration for `cwd` and create services
    pub async fn new(
        cwd: &Path,
        config_path: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self> {
        let config = load_config(overrides, config_path, cwd).await?;

        let platform_config = PlatformConfig {
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            host: config.host.clone(),
        };
        let platform = create_platform_service(&platform_config, &config.token)?;

        let workdir = if config.workdir.is_relative() {
            cwd.join(&config.workdir)
        } else {
            config.workdir.clone()
        };
        let trigger = GitTrigger::new(
            GitRunner::new(),
            workdir,
            config.remote.clone(),
            config.identity.clone(),
            config.empty_commit_message.clone(),
            config.git_timeout,
        );

        Ok(Self {
            config,
            platform,
            trigger,
        })
    }
}
