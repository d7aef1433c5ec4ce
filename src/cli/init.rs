//! Init command - write a config template

use crate::cli::style::{Stylize, check};
use anstream::println;
use anyhow::{Context, Result};
use run_ci::config::file::write_template;
use run_ci::config::CONFIG_FILE_NAME;
use std::path::Path;

/// Write `.run-ci.toml` into `dir` unless a config file exists
pub fn run_init(dir: &Path) -> Result<()> {
    let created = write_template(dir)
        .with_context(|| format!("failed to write {CONFIG_FILE_NAME} in {}", dir.display()))?;

    match created {
        Some(path) => println!("{} Created {}", check(), path.display().emphasis()),
        None => println!(
            "{}",
            "a run-ci config file already exists; left unchanged".muted()
        ),
    }
    Ok(())
}
