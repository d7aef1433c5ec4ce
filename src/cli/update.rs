//! Update command - re-run CI on PRs with a stale base

use crate::cli::CliProgress;
use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, counts_line};
use anstream::println;
use run_ci::config::ConfigOverrides;
use run_ci::error::Result;
use run_ci::logging::init_logging;
use run_ci::update::{Controller, ControllerOptions};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Run the update command
///
/// Returns whether the run succeeded: no failed PR and not interrupted.
pub async fn run_update(
    cwd: &Path,
    config_path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<bool> {
    let ctx = CommandContext::new(cwd, config_path, overrides).await?;
    init_logging(ctx.config.log_level);
    debug!(config = ?ctx.config, "resolved configuration");

    let cancel = CancellationToken::new();
    watch_for_interrupt(cancel.clone());
    if let Some(deadline) = ctx.config.run_timeout {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            warn!(?deadline, "run deadline reached; cancelling");
            cancel.cancel();
        });
    }

    if ctx.config.dry_run {
        println!("{}", "Dry run: no commits will be pushed".warn());
    }

    let options = ControllerOptions {
        api_timeout: ctx.config.api_timeout,
        retry: ctx.config.retry,
        dry_run: ctx.config.dry_run,
    };
    let controller = Controller::new(
        ctx.platform.as_ref(),
        &ctx.trigger,
        ctx.config.filter.clone(),
        ctx.config.selection.clone(),
        options,
        cancel,
    );

    let progress = CliProgress::new();
    let summary = controller.run(&progress).await?;

    println!("{}", counts_line(&summary.counts(), summary.interrupted));
    info!(
        elapsed_ms = (summary.finished_at - summary.started_at).num_milliseconds(),
        success = summary.is_success(),
        "run finished"
    );
    Ok(summary.is_success())
}

fn watch_for_interrupt(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; stopping after restoring the working copy");
            cancel.cancel();
        }
    });
}
