use std::path::Path;

use anyhow::Context;
use kwrank_core::BatchStatus;

use super::{batch_symbol, item_symbol, truncate};
use crate::fmt_timestamp;

/// List batches with their report and progress.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_batch_list(
    pool: &sqlx::SqlitePool,
    status: Option<BatchStatus>,
    limit: u32,
) -> anyhow::Result<()> {
    let batches = kwrank_db::list_batches(pool, status, i64::from(limit)).await?;

    if batches.is_empty() {
        println!(
            "no batches found{}; run `batch create <file>` first",
            status.map(|s| format!(" with status {s}")).unwrap_or_default()
        );
        return Ok(());
    }

    println!(
        "{:<6}{:<14}{:>11}  {:<10}{:<18}NOTES",
        "ID", "STATUS", "DONE/TOTAL", "MONTH", "CREATED"
    );
    for batch in &batches {
        let done = format!(
            "{}/{}",
            batch.completed_items + batch.failed_items,
            batch.total_items
        );
        println!(
            "{:<6}{} {:<12}{:>11}  {:<10}{:<18}{}",
            batch.id,
            batch_symbol(batch.status),
            batch.status,
            done,
            batch.data_month,
            fmt_timestamp(Some(batch.created_at)),
            truncate(batch.notes.as_deref().unwrap_or(""), 40)
        );
    }

    Ok(())
}

/// Show a batch's progress and the state of every keyword, with failed and
/// in-flight keywords first.
///
/// # Errors
///
/// Returns an error if the batch is not found or a query fails.
pub(crate) async fn run_batch_status(pool: &sqlx::SqlitePool, batch_id: i64) -> anyhow::Result<()> {
    let batch = kwrank_db::get_batch(pool, batch_id)
        .await
        .with_context(|| format!("batch #{batch_id} not found"))?;
    let report = kwrank_db::get_report(pool, batch.report_id).await?;
    let counts = kwrank_db::count_items_by_status(pool, batch_id).await?;
    let items = kwrank_db::list_items_for_status_view(pool, batch_id).await?;

    let done = counts.completed + counts.failed;
    let percent = (done * 100).checked_div(counts.total()).unwrap_or(0);

    println!(
        "Batch #{} {} {}",
        batch.id,
        batch_symbol(batch.status),
        batch.status
    );
    println!(
        "Report: #{} {} ({}, {})",
        report.id, report.external_report_id, report.data_month, report.user_locale
    );
    if let Some(notes) = batch.notes.as_deref() {
        println!("Notes: {notes}");
    }
    println!(
        "Progress: {done}/{} ({percent}%, {} remaining) \u{2014} {} completed, {} failed, {} in progress, {} pending",
        counts.total(),
        batch.remaining_items(),
        counts.completed,
        counts.failed,
        counts.in_progress,
        counts.pending
    );
    println!(
        "Started: {}  Finished: {}",
        fmt_timestamp(batch.started_at),
        fmt_timestamp(batch.completed_at)
    );
    if let Some(secs) = batch.duration_seconds {
        println!("Duration: {}", kwrank_batch::format_duration(secs));
    }
    if let Some(holder) = batch.claimed_by.as_deref() {
        println!(
            "Claimed by: {holder} until {}",
            fmt_timestamp(batch.claim_expires_at)
        );
    }
    println!();

    println!("{:<3}{:<30}{:<24}DETAIL", "", "SEARCH TERM", "GENRE");
    for item in &items {
        let detail = item
            .error_message
            .as_deref()
            .or(item.search_id.as_deref())
            .unwrap_or("");
        println!(
            "{:<3}{:<30}{:<24}{}",
            item_symbol(item.status),
            truncate(&item.search_term, 28),
            truncate(&item.genre, 22),
            truncate(detail, 60)
        );
    }

    Ok(())
}

/// Export a batch's results as pretty-printed JSON to `output` or stdout.
///
/// # Errors
///
/// Returns an error if the batch is not found, a query fails, or the file
/// cannot be written.
pub(crate) async fn run_batch_report(
    pool: &sqlx::SqlitePool,
    batch_id: i64,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let report = kwrank_batch::build_batch_report(pool, batch_id).await?;
    let json = serde_json::to_string_pretty(&report)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "wrote batch #{batch_id} report ({} results, {} not completed) to {}",
                report.metadata.successful,
                report.metadata.failed,
                path.display()
            );
        }
        None => println!("{json}"),
    }

    Ok(())
}
