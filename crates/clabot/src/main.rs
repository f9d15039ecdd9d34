//! `clabot` CLI entry point.
//!
//! Performs exactly one reconciliation pass per invocation and hands
//! the run report (or failure) to the notification collaborator.
//! Periodic scheduling and non-overlap of invocations belong to the
//! invoking scheduler (cron/CI), not to this binary.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use notify::{Notifier, RunEvent};
use tracing::error;

use clabot::{Config, GitHubSource, Reconciler, RunReport, SignerRoster};

/// Reconcile CLA signature status for open pull requests
#[derive(Parser)]
#[command(name = "clabot")]
#[command(about = "Reconcile CLA signature status for open pull requests")]
#[command(version)]
struct Cli {
    /// Repository in owner/name form (overrides CLA_REPOSITORY)
    #[arg(long)]
    repository: Option<String>,

    /// Path to the signer roster file (overrides CLA_ROSTER_PATH)
    #[arg(long)]
    roster: Option<PathBuf>,

    /// Evaluate transitions but issue no mutating call
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "clabot=debug,notify=debug"
    } else {
        "clabot=info,notify=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let notifier = Notifier::from_env();

    match run(&cli).await {
        Ok((repository, report)) => {
            println!("{}", report.trace.render());
            let summary = &report.summary;
            let _ = notifier
                .notify_and_wait(RunEvent::RunCompleted {
                    repository,
                    prs_listed: summary.prs_listed,
                    candidates: summary.candidates,
                    newly_signed: summary.newly_signed,
                    still_missing: summary.still_missing,
                    elapsed_secs: summary.elapsed_secs,
                    trace: report.trace.render(),
                    timestamp: summary.run_time,
                })
                .await;
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Reconciliation failed: {e:#}");
            let repository = cli.repository.clone().unwrap_or_else(|| {
                std::env::var("CLA_REPOSITORY").unwrap_or_else(|_| "<unknown>".to_string())
            });
            let _ = notifier
                .notify_and_wait(RunEvent::RunFailed {
                    repository,
                    error: format!("{e:#}"),
                    timestamp: chrono::Utc::now(),
                })
                .await;
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<(String, RunReport)> {
    let mut config = build_config(cli)?;
    config.dry_run = cli.dry_run;

    let roster = SignerRoster::load(&config.roster_path)?;
    let mut source = GitHubSource::new(&config)?;

    let report = Reconciler::new(&mut source, &roster, &config).run().await?;
    Ok((config.repo_path(), report))
}

/// Environment configuration with CLI flags layered on top.
fn build_config(cli: &Cli) -> Result<Config> {
    if let Some(repository) = &cli.repository {
        // from_env validates and splits the repository value.
        std::env::set_var("CLA_REPOSITORY", repository);
    }
    let mut config = Config::from_env()?;
    if let Some(roster) = &cli.roster {
        config.roster_path.clone_from(roster);
    }
    Ok(config)
}
