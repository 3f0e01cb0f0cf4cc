use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{
    fs::{self, OpenOptions},
    sync::Mutex,
};

use textmap_core::{AppConfig, Pipeline, RunOptions, RunOutcome};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Export game data tables and text maps from an upstream repository.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Export if the upstream repository has a new commit.
    Run {
        /// Export even if the upstream commit was already processed.
        #[arg(long)]
        force: bool,
        /// Commit and push the exports afterwards.
        #[arg(long)]
        publish: bool,
    },
    /// Compare the local marker with the upstream head.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    let config = AppConfig::load()?;
    let pipeline = Pipeline::new(config)?;

    match cli.command.unwrap_or(Command::Run {
        force: false,
        publish: false,
    }) {
        Command::Run { force, publish } => {
            let publish = publish || pipeline.sync().config().publish.enabled;
            match pipeline.run(RunOptions { force, publish }).await? {
                RunOutcome::UpToDate { commit } => {
                    info!(%commit, "nothing to do");
                }
                RunOutcome::Exported {
                    upstream,
                    files,
                    published,
                } => {
                    let sha = upstream.map(|commit| commit.sha).unwrap_or_default();
                    info!(commit = %sha, files = files.len(), published, "exports updated");
                }
            }
        }
        Command::Status => {
            let decision = pipeline.sync().check(false).await?;
            let local = if decision.local.is_empty() {
                "(none)"
            } else {
                decision.local.as_str()
            };
            println!("local:    {local}");
            println!("upstream: {}", decision.latest_sha());
            if let Some(date) = decision.latest.as_ref().and_then(|c| c.committed_at) {
                println!("date:     {}", date.to_rfc3339());
            }
            println!(
                "{}",
                if decision.proceed {
                    "a run would export new data"
                } else {
                    "up to date"
                }
            );
        }
    }

    Ok(())
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("textmap.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stdout);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(())
}
