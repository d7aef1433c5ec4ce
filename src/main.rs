//! run-ci - re-run CI on pull requests whose base branch has moved

mod cli;

use anstream::eprintln;
use clap::{Args, Parser, Subcommand};
use cli::style::{Stylize, cross};
use run_ci::config::ConfigOverrides;
use std::path::PathBuf;
use std::process::ExitCode;

/// Push an empty commit to open pull requests whose base branch has advanced,
/// so CI runs against the latest base
#[derive(Parser)]
#[command(name = "run-ci", version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-run CI on open pull requests with a stale base
    UpdatePr(UpdatePrArgs),
    /// Write a commented .run-ci.toml into the current directory
    Init,
}

#[derive(Args)]
struct UpdatePrArgs {
    /// Repository owner [default: from GITHUB_REPOSITORY or the git remote]
    #[arg(long)]
    owner: Option<String>,

    /// Repository name [default: from GITHUB_REPOSITORY or the git remote]
    #[arg(long)]
    repo: Option<String>,

    /// GitHub access token [default: GITHUB_TOKEN, GITHUB_ACCESS_TOKEN, or `gh auth token`]
    #[arg(long)]
    github_token: Option<String>,

    /// Only pull requests targeting this base branch
    #[arg(long)]
    base: Option<String>,

    /// Every open pull request
    #[arg(long)]
    all: bool,

    /// Filter expression, e.g. `draft == false && "ci" in labels`
    #[arg(long)]
    expr: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Config file [default: .run-ci.toml in this or a parent directory]
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Working copy used to push the empty commit
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Git remote to fetch from and push to
    #[arg(long)]
    remote: Option<String>,

    /// Report what would be triggered without pushing
    #[arg(long)]
    dry_run: bool,

    /// Overall deadline in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

impl UpdatePrArgs {
    fn into_parts(self) -> (Option<PathBuf>, ConfigOverrides) {
        let overrides = ConfigOverrides {
            owner: self.owner,
            repo: self.repo,
            github_token: self.github_token,
            base: self.base,
            all: self.all,
            expr: self.expr,
            log_level: self.log_level,
            workdir: self.workdir,
            remote: self.remote,
            dry_run: self.dry_run,
            timeout_secs: self.timeout,
        };
        (self.config, overrides)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(e) => {
            eprintln!("{} cannot read current directory: {e}", cross());
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::UpdatePr(args) => {
            let (config_path, overrides) = args.into_parts();
            match cli::run_update(&cwd, config_path.as_deref(), overrides).await {
                Ok(true) => ExitCode::SUCCESS,
                Ok(false) => ExitCode::FAILURE,
                Err(e) => {
                    eprintln!("{} {}", cross(), e.to_string().error());
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Init => match cli::run_init(&cwd) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{} {}", cross(), format!("{e:#}").error());
                ExitCode::FAILURE
            }
        },
    }
}
