//! The update run: select, filter, detect, trigger

mod controller;
mod staleness;
mod summary;

pub use controller::{Controller, ControllerOptions, NoProgress, ProgressCallback, RetryPolicy};
pub use staleness::{Staleness, StalenessDetector, classify};
pub use summary::{Action, FailureReason, OutcomeCounts, OutcomeRecord, RunSummary, short_sha};
