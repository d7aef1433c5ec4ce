//! Command implementations for the `run-ci` binary

pub mod context;
pub mod init;
pub mod style;
pub mod update;

pub use init::run_init;
pub use update::run_update;

use anstream::println;
use async_trait::async_trait;
use indicatif::ProgressBar;
use run_ci::types::Selection;
use run_ci::update::{OutcomeRecord, ProgressCallback};
use std::sync::Mutex;
use std::time::Duration;
use style::{Stylize, check, outcome_line, spinner_style};

/// Progress output for the terminal
///
/// Shows a spinner while listing and prints one line per processed PR.
pub struct CliProgress {
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    /// Create a progress reporter
    pub const fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_listing(&self, selection: &Selection) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_message(format!(
            "Listing open pull requests ({})...",
            selection.emphasis()
        ));
        spinner.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut slot) = self.spinner.lock() {
            *slot = Some(spinner);
        }
    }

    async fn on_listed(&self, count: usize) {
        let spinner = self.spinner.lock().ok().and_then(|mut slot| slot.take());
        if let Some(spinner) = spinner {
            spinner.finish_with_message(format!(
                "{} Found {} open pull request{}",
                check(),
                count.accent(),
                if count == 1 { "" } else { "s" }
            ));
        }
    }

    async fn on_outcome(&self, record: &OutcomeRecord) {
        println!("{}", outcome_line(record));
    }
}
