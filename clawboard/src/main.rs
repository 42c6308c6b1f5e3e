//! clawboard - dashboard data collector for agent session transcripts
//!
//! Reads the agent's JSONL transcripts and workspace, and rebuilds the JSON
//! artifacts a static dashboard serves.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/clawboard/config.toml (~/.config/clawboard/config.toml)
//! - Logs: $XDG_STATE_HOME/clawboard/clawboard.log (~/.local/state/clawboard/clawboard.log)
//! - Locks: $XDG_RUNTIME_DIR/clawboard/

mod process_lock;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use clawboard_core::{Config, Pipeline, Step};
use process_lock::acquire_run_guard;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clawboard")]
#[command(about = "Rebuild dashboard data from agent session transcripts")]
#[command(version)]
struct Args {
    /// What to rebuild
    #[arg(value_enum, default_value_t = Target::All)]
    target: Target,

    /// Config file (defaults to $XDG_CONFIG_HOME/clawboard/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose output (-v debug, -vv trace), mirrored to stderr
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Target {
    /// Every step, in order
    All,
    /// Session index and per-session views
    Logs,
    /// Token and cost rollups
    Usage,
    /// Recent chat history
    Chat,
    /// Meta, memory notes, skill list and system info
    Dashboard,
    /// Workspace configuration documents
    Config,
    /// Skill activation status (needs a prior dashboard run)
    Skills,
}

impl Target {
    fn steps(self) -> Vec<Step> {
        match self {
            Target::All => Step::ALL.to_vec(),
            Target::Logs => vec![Step::Logs],
            Target::Usage => vec![Step::Usage],
            Target::Chat => vec![Step::Chat],
            Target::Dashboard => vec![Step::Dashboard],
            Target::Config => vec![Step::Config],
            Target::Skills => vec![Step::SkillStatus],
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::load().context("failed to load configuration")?,
    };

    let _log_guard = clawboard_core::logging::init(&config.logging, args.verbose)
        .context("failed to initialize logging")?;

    tracing::info!(steps = ?args.target, "clawboard starting");

    let output_dir = config.paths.output_dir.clone();
    let _run_guard = acquire_run_guard(&output_dir).context("failed to acquire process lock")?;

    let pipeline = Pipeline::new(config);
    let report = pipeline
        .run(&args.target.steps())
        .with_context(|| format!("failed to prepare output directory {}", output_dir.display()))?;

    for outcome in &report.outcomes {
        println!("{}", outcome.summary);
    }
    if report.transcripts_skipped > 0 {
        eprintln!(
            "Skipped {} unreadable transcript(s); see {}",
            report.transcripts_skipped,
            clawboard_core::logging::log_file_path().display()
        );
    }
    for failure in &report.failures {
        eprintln!("Error: {failure}");
    }

    tracing::info!(
        transcripts = report.transcripts,
        skipped = report.transcripts_skipped,
        malformed_lines = report.malformed_lines,
        stale_removed = report.stale_removed,
        failures = report.failures.len(),
        "clawboard finished"
    );

    Ok(())
}
