//! Batch command handlers for the CLI.
//!
//! `create`, `process`, and `requeue` mutate the batch queue; the remaining
//! subcommands are read-only queries.

mod query;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Subcommand;
use kwrank_batch::{BatchError, ProcessorConfig, SubprocessAnalyzer};
use kwrank_core::config::parse_rate_limit;
use kwrank_core::{AppConfig, BatchStatus, ItemStatus};

pub(crate) use query::{run_batch_list, run_batch_report, run_batch_status};

/// Sub-commands available under `batch`.
#[derive(Debug, Subcommand)]
pub enum BatchCommands {
    /// Create a batch from a keyword selection file
    Create {
        /// JSON selection file (see `keywords top --output`)
        selection: PathBuf,
        /// Free-text notes stored with the batch
        #[arg(long)]
        notes: Option<String>,
    },
    /// List batches, newest first
    List {
        /// Maximum number of batches to show
        #[arg(long, default_value = "20")]
        limit: u32,
        /// Only show batches in this status
        #[arg(long, value_parser = parse_batch_status)]
        status: Option<BatchStatus>,
    },
    /// Show progress and per-keyword state of a batch
    Status {
        id: i64,
    },
    /// Run the analysis tool for every pending keyword of a batch
    Process {
        id: i64,
        /// Seconds to wait between tool runs (defaults to KWRANK_RATE_LIMIT_SECS)
        #[arg(long, value_parser = parse_rate_limit)]
        rate_limit: Option<Duration>,
    },
    /// Return keywords stuck in progress after an interrupted run to pending
    Requeue {
        id: i64,
    },
    /// Export a batch's results as JSON
    Report {
        id: i64,
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn parse_batch_status(raw: &str) -> Result<BatchStatus, String> {
    raw.parse::<BatchStatus>().map_err(|e| e.to_string())
}

/// Dispatch a `batch` subcommand.
///
/// # Errors
///
/// Propagates the handler's error.
pub(crate) async fn run(
    pool: &sqlx::SqlitePool,
    config: &AppConfig,
    command: BatchCommands,
) -> anyhow::Result<()> {
    match command {
        BatchCommands::Create { selection, notes } => {
            run_batch_create(pool, &selection, notes.as_deref()).await
        }
        BatchCommands::List { limit, status } => run_batch_list(pool, status, limit).await,
        BatchCommands::Status { id } => run_batch_status(pool, id).await,
        BatchCommands::Process { id, rate_limit } => {
            run_batch_process(pool, config, id, rate_limit).await
        }
        BatchCommands::Requeue { id } => run_batch_requeue(pool, id).await,
        BatchCommands::Report { id, output } => run_batch_report(pool, id, output.as_deref()).await,
    }
}

/// Create a `pending` batch from a selection file.
///
/// # Errors
///
/// Returns an error if the file is invalid, no active report matches, or no
/// keyword of the selection resolves.
pub(crate) async fn run_batch_create(
    pool: &sqlx::SqlitePool,
    selection: &Path,
    notes: Option<&str>,
) -> anyhow::Result<()> {
    let outcome = kwrank_batch::create_batch_from_file(pool, selection, notes).await?;

    println!(
        "created batch #{} from report #{} ({}, {})",
        outcome.batch_id, outcome.report_id, outcome.data_month, outcome.country
    );
    println!(
        "  {} of {} selected keywords queued",
        outcome.resolved, outcome.requested
    );
    if !outcome.unmatched.is_empty() {
        println!("  not found in report: {}", outcome.unmatched.join(", "));
    }
    println!("run `batch process {}` to start", outcome.batch_id);

    Ok(())
}

/// Process every pending keyword of a batch.
///
/// # Errors
///
/// Returns an error on any hard failure, and also when one or more keywords
/// failed during this run so the exit status reflects it.
pub(crate) async fn run_batch_process(
    pool: &sqlx::SqlitePool,
    config: &AppConfig,
    batch_id: i64,
    rate_limit: Option<Duration>,
) -> anyhow::Result<()> {
    let analyzer = SubprocessAnalyzer::from_config(config)?;
    let mut processor = ProcessorConfig::from_app_config(config);
    if let Some(rate_limit) = rate_limit {
        processor.rate_limit = rate_limit;
    }

    println!(
        "processing batch #{batch_id} with `{}` ({:.1}s between keywords)",
        analyzer.program(),
        processor.rate_limit.as_secs_f64()
    );

    let summary = match kwrank_batch::process_batch(pool, &analyzer, batch_id, &processor).await {
        Ok(summary) => summary,
        Err(BatchError::Claimed { holder, .. }) => anyhow::bail!(
            "batch #{batch_id} is being processed by another run ({holder}); \
             wait for it or let its lease expire"
        ),
        Err(e) => return Err(e.into()),
    };

    println!(
        "batch #{}: {} succeeded, {} failed this run; status {}",
        summary.batch_id, summary.succeeded, summary.failed, summary.status
    );

    if summary.status == BatchStatus::InProgress {
        println!(
            "some keywords are still in progress; run `batch requeue {batch_id}` then process again"
        );
    }

    if summary.failed > 0 {
        anyhow::bail!(
            "{} keyword(s) failed; see `batch status {batch_id}`",
            summary.failed
        );
    }

    Ok(())
}

/// Return stuck `in_progress` keywords of a batch to `pending`.
///
/// # Errors
///
/// Returns an error if the batch is unknown, another run holds its lease, or
/// the update fails.
pub(crate) async fn run_batch_requeue(pool: &sqlx::SqlitePool, batch_id: i64) -> anyhow::Result<()> {
    let requeued = kwrank_batch::requeue_stuck_items(pool, batch_id).await?;
    if requeued == 0 {
        println!("batch #{batch_id} has no keywords stuck in progress");
    } else {
        println!("returned {requeued} keyword(s) of batch #{batch_id} to pending");
    }
    Ok(())
}

const DONE: &str = "\u{2713}";
const FAILED: &str = "\u{2717}";
const RUNNING: &str = "\u{27f3}";
const WAITING: &str = "\u{00b7}";

/// Glyph shown next to a batch in listings.
pub(crate) fn batch_symbol(status: BatchStatus) -> &'static str {
    match status {
        BatchStatus::Completed => DONE,
        BatchStatus::Failed => FAILED,
        BatchStatus::InProgress => RUNNING,
        BatchStatus::Pending => WAITING,
    }
}

/// Glyph shown next to a keyword in `batch status`.
pub(crate) fn item_symbol(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Completed => DONE,
        ItemStatus::Failed => FAILED,
        ItemStatus::InProgress => RUNNING,
        ItemStatus::Pending => WAITING,
    }
}

/// Truncate `s` to `max` characters, appending `...` when cut.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max).collect::<String>())
    } else {
        s.to_string()
    }
}
