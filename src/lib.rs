//! run-ci: re-run CI on pull requests whose base branch has moved
//!
//! For every open pull request selected by base branch (or all of them),
//! `run-ci` evaluates a filter expression, checks whether the base commit
//! GitHub recorded for the PR is behind the live base branch, and if so
//! pushes an empty commit to the head branch so CI runs again.
//!
//! # Modules
//!
//! - [`config`]: layered configuration (flags, env, `.run-ci.toml`)
//! - [`expr`]: the filter expression language
//! - [`platform`]: GitHub API access
//! - [`trigger`]: the git sequence that pushes the empty commit
//! - [`update`]: the run itself (staleness detection and orchestration)

pub mod auth;
pub mod config;
pub mod error;
pub mod expr;
pub mod logging;
pub mod platform;
pub mod trigger;
pub mod types;
pub mod update;

pub use error::{ConfigError, Error, Result};
