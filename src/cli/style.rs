//! Terminal styling helpers
//!
//! Output goes through `anstream`, which strips these escapes when stdout is
//! not a terminal.

use indicatif::ProgressStyle;
use owo_colors::OwoColorize;
use run_ci::update::{Action, OutcomeCounts, OutcomeRecord, short_sha};
use std::fmt::Display;

/// Check mark
pub const CHECK: &str = "✓";
/// Cross mark
pub const CROSS: &str = "✗";

/// Semantic styles for any displayable value
pub trait Stylize: Display {
    /// Bold
    fn emphasis(&self) -> String {
        format!("{}", self.bold())
    }

    /// Cyan, for identifiers like PR numbers and branches
    fn accent(&self) -> String {
        format!("{}", self.cyan())
    }

    /// Dimmed, for secondary information
    fn muted(&self) -> String {
        format!("{}", self.dimmed())
    }

    /// Green
    fn success(&self) -> String {
        format!("{}", self.green())
    }

    /// Yellow
    fn warn(&self) -> String {
        format!("{}", self.yellow())
    }

    /// Red
    fn error(&self) -> String {
        format!("{}", self.red())
    }
}

impl<T: Display> Stylize for T {}

/// Green check mark
pub fn check() -> String {
    CHECK.success()
}

/// Red cross mark
pub fn cross() -> String {
    CROSS.error()
}

/// Style for the listing spinner
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
}

/// One summary line: `#12 feature-x  triggered abc1234`
pub fn outcome_line(record: &OutcomeRecord) -> String {
    let action = match &record.action {
        Action::Triggered { sha } => format!(
            "{} {}",
            record.action.label().success(),
            short_sha(sha).muted()
        ),
        Action::WouldTrigger => record.action.label().warn(),
        Action::Failed(reason) => format!("{}: {reason}", record.action.label().error()),
        Action::UpToDate | Action::SkippedByFilter => record.action.label().muted(),
    };
    format!(
        "{} {}  {action}",
        format!("#{}", record.number).accent(),
        record.head_ref.emphasis()
    )
}

/// Closing counts line
pub fn counts_line(counts: &OutcomeCounts, interrupted: bool) -> String {
    let line = counts.to_string();
    let line = if counts.failed > 0 {
        line.error()
    } else {
        line.emphasis()
    };
    if interrupted {
        format!("{line} {}", "(interrupted)".warn())
    } else {
        line
    }
}
