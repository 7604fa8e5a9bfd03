//! CLI for the ticket reconciler.
//!
//! Converges the issues of a remote tracker project towards the tickets of
//! a legacy Trac database. Safe to rerun; only differences are written.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use ticket_reconciler::{RunSummary, Runner, RunnerConfig, RunnerError};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Ticket Reconciler - Bring tracker issues in line with legacy Trac tickets.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SQL clause appended to `SELECT * FROM ticket`, e.g. "WHERE id > 100".
    filter: Option<String>,

    /// Path to the configuration file.
    #[arg(long, env = "TICKET_RECONCILER_CONFIG", default_value = "ticket-reconciler.toml")]
    config: PathBuf,

    /// Tracker user for basic authentication.
    #[arg(long, env = "TRACKER_USER")]
    user: String,

    /// Tracker API token.
    #[arg(long, env = "TRACKER_TOKEN", hide_env_values = true)]
    token: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = Args::parse();

    match run(args).await {
        Ok(summary) => {
            print_summary(&summary);

            if summary.has_failures() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!(error = %e, "Critical failure");
            ExitCode::from(1)
        }
    }
}

/// Installs a compact subscriber filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn runner_config(args: Args) -> RunnerConfig {
    RunnerConfig::new(args.config, args.user, args.token).with_filter(args.filter)
}

async fn run(args: Args) -> Result<RunSummary, RunnerError> {
    let runner = Runner::new(runner_config(args))?;
    runner.run().await
}

/// Prints the final run summary.
fn print_summary(summary: &RunSummary) {
    println!("\nSummary:");
    println!("  Tickets scanned: {}", summary.tickets_scanned);
    println!("  Tickets skipped: {}", summary.tickets_skipped);
    println!(
        "  Updated {}/{} tickets",
        summary.updates.len(),
        summary.tickets_scanned
    );
    println!(
        "  Comments: {} added, {} updated, {} neutralized",
        summary.actions.comments_created,
        summary.actions.comments_updated,
        summary.actions.comments_neutralized
    );
    println!(
        "  Attachments: {} uploaded, {} deleted",
        summary.actions.attachments_uploaded, summary.actions.attachments_deleted
    );
    println!("  Links created: {}", summary.actions.links_created);

    if summary.has_failures() {
        println!("\nError in {} tickets:", summary.errors.len());
        for (key, message) in &summary.errors {
            println!("  {key}: {message}");
        }
    }
}
