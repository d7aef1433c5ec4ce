//! Logging setup using `tracing` + `tracing-subscriber`
//!
//! The level comes from the resolved configuration (`--log-level`, then
//! `RUN_CI_LOG_LEVEL`, then the config file) and defaults to `info`.
//! Dependencies only log warnings and errors. Logs go to stderr so stdout
//! carries just the run summary.

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

/// Filter directives for `level`
pub fn filter_directives(level: Option<Level>) -> String {
    let level = level.unwrap_or(Level::INFO);
    format!("warn,run_ci={}", level.as_str().to_lowercase())
}

/// Install the global subscriber
///
/// Calling it again is a no-op.
pub fn init_logging(level: Option<Level>) {
    let filter = EnvFilter::new(filter_directives(level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
