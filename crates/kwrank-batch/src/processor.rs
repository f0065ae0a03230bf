//! Sequential batch processing against the analysis tool.
//!
//! One invocation works through the batch's `pending` items in creation
//! order, one tool run at a time with a pause between runs. Every item is
//! committed as soon as its outcome is known, so an interrupted run resumes
//! where it stopped. A lease on the batch row keeps two processes from
//! working the same batch.

use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use kwrank_core::{AppConfig, BatchStatus, ItemStatus};
use kwrank_db::{
    claim_batch, count_items_by_status, find_latest_search_after, finish_batch, finish_item,
    get_batch, list_items_by_status, mark_item_in_progress, release_claim, renew_claim,
    requeue_in_progress_items, return_item_to_pending, start_batch, BatchItemRow, DbError,
    ItemResolution,
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::analyzer::{AnalyzeOutcome, Analyzer};
use crate::BatchError;

/// Note stored on items whose tool run succeeded but left no search behind.
pub const NO_RESULTS_NOTE: &str = "no search results recorded for this keyword";

const DEFAULT_STDERR_LIMIT: usize = 200;

/// Pacing and lease settings for [`process_batch`].
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Pause between consecutive tool runs.
    pub rate_limit: Duration,
    /// Wait after a successful run before looking for its search row.
    pub settle_delay: Duration,
    /// How long a claim stays valid without renewal.
    pub lease: Duration,
    pub storefront: Option<String>,
    /// Maximum characters of tool stderr kept as an item's error.
    pub stderr_limit: usize,
}

impl ProcessorConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            rate_limit: config.rate_limit,
            settle_delay: config.settle_delay(),
            lease: config.lease(),
            storefront: config.analyzer_storefront.clone(),
            stderr_limit: DEFAULT_STDERR_LIMIT,
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            rate_limit: Duration::from_secs(2),
            settle_delay: Duration::from_millis(500),
            lease: Duration::from_secs(300),
            storefront: None,
            stderr_limit: DEFAULT_STDERR_LIMIT,
        }
    }
}

/// What one [`process_batch`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessSummary {
    pub batch_id: i64,
    /// Items completed during this call.
    pub succeeded: usize,
    /// Items failed during this call.
    pub failed: usize,
    /// Batch status when the call returned.
    pub status: BatchStatus,
}

/// Processes every `pending` item of a batch and settles its status.
///
/// A batch with nothing pending is returned untouched. When items are left
/// `in_progress` by an earlier interrupted run, the batch stays
/// `in_progress` until they are requeued and processed.
///
/// # Errors
///
/// Returns [`BatchError::NotFound`] for an unknown batch,
/// [`BatchError::Claimed`] when another process holds the lease,
/// [`BatchError::LeaseLost`] if the lease is taken over mid-run,
/// [`BatchError::Analyzer`] if the tool cannot be started (the item is put
/// back to `pending`), or [`BatchError::Db`] on a store failure.
pub async fn process_batch<A: Analyzer>(
    pool: &SqlitePool,
    analyzer: &A,
    batch_id: i64,
    config: &ProcessorConfig,
) -> Result<ProcessSummary, BatchError> {
    let batch = load_batch(pool, batch_id).await?;
    let items = list_items_by_status(pool, batch_id, ItemStatus::Pending).await?;

    if items.is_empty() {
        tracing::info!(batch_id, status = %batch.status, "no pending items");
        return Ok(ProcessSummary {
            batch_id,
            succeeded: 0,
            failed: 0,
            status: batch.status,
        });
    }

    let holder = Uuid::new_v4().to_string();
    let now = Utc::now();
    if !claim_batch(pool, batch_id, &holder, now, lease_expiry(now, config.lease)).await? {
        return Err(BatchError::Claimed {
            batch_id,
            holder: batch.claimed_by.unwrap_or_default(),
        });
    }

    let result = run_claimed(pool, analyzer, batch_id, &items, &holder, config).await;

    if let Err(err) = release_claim(pool, batch_id, &holder).await {
        tracing::warn!(batch_id, error = %err, "failed to release batch lease");
    }

    result
}

/// Resets items left `in_progress` by an interrupted run back to `pending`.
/// Returns how many were reset.
///
/// # Errors
///
/// Returns [`BatchError::NotFound`] for an unknown batch,
/// [`BatchError::Claimed`] while another process holds a live lease, or
/// [`BatchError::Db`] on a store failure.
pub async fn requeue_stuck_items(pool: &SqlitePool, batch_id: i64) -> Result<u64, BatchError> {
    let batch = load_batch(pool, batch_id).await?;
    if batch.is_claimed_at(Utc::now()) {
        return Err(BatchError::Claimed {
            batch_id,
            holder: batch.claimed_by.unwrap_or_default(),
        });
    }

    let requeued = requeue_in_progress_items(pool, batch_id).await?;
    tracing::info!(batch_id, requeued, "requeued stuck items");
    Ok(requeued)
}

async fn load_batch(pool: &SqlitePool, batch_id: i64) -> Result<kwrank_db::BatchRow, BatchError> {
    get_batch(pool, batch_id).await.map_err(|e| match e {
        DbError::NotFound => BatchError::NotFound(batch_id),
        other => BatchError::Db(other),
    })
}

async fn run_claimed<A: Analyzer>(
    pool: &SqlitePool,
    analyzer: &A,
    batch_id: i64,
    items: &[BatchItemRow],
    holder: &str,
    config: &ProcessorConfig,
) -> Result<ProcessSummary, BatchError> {
    start_batch(pool, batch_id, Utc::now()).await?;

    let total = items.len();
    let mut succeeded = 0usize;
    let mut failed = 0usize;

    tracing::info!(batch_id, pending = total, "processing batch");

    for (idx, item) in items.iter().enumerate() {
        let position = idx + 1;
        mark_item_in_progress(pool, item.id).await?;
        // The tool stamps its searches with the local wall clock.
        let before = Local::now().naive_local();

        tracing::info!(
            batch_id,
            item_id = item.id,
            position,
            total,
            term = %item.search_term,
            "analyzing keyword"
        );

        let outcome = match analyzer
            .analyze(&item.search_term, config.storefront.as_deref())
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                if let Err(db_err) = return_item_to_pending(pool, item.id).await {
                    tracing::warn!(item_id = item.id, error = %db_err, "failed to requeue item");
                }
                return Err(err.into());
            }
        };

        let resolution = resolve_outcome(pool, item, outcome, before, config).await?;
        finish_item(pool, batch_id, item.id, &resolution, Utc::now()).await?;

        match &resolution {
            ItemResolution::Completed { search_id, .. } => {
                succeeded += 1;
                tracing::info!(
                    item_id = item.id,
                    position,
                    total,
                    search_id = search_id.as_deref().unwrap_or("-"),
                    "keyword completed"
                );
            }
            ItemResolution::Failed { error } => {
                failed += 1;
                tracing::warn!(item_id = item.id, position, total, %error, "keyword failed");
            }
        }

        let expires_at = lease_expiry(Utc::now(), config.lease);
        if !renew_claim(pool, batch_id, holder, expires_at).await? {
            return Err(BatchError::LeaseLost(batch_id));
        }

        if position < total && !config.rate_limit.is_zero() {
            tokio::time::sleep(config.rate_limit).await;
        }
    }

    let status = settle_batch(pool, batch_id).await?;

    tracing::info!(batch_id, succeeded, failed, %status, "batch processing finished");

    Ok(ProcessSummary {
        batch_id,
        succeeded,
        failed,
        status,
    })
}

/// Finalizes the batch from persisted item counts unless items are still
/// outstanding.
async fn settle_batch(pool: &SqlitePool, batch_id: i64) -> Result<BatchStatus, BatchError> {
    let counts = count_items_by_status(pool, batch_id).await?;
    if counts.pending > 0 || counts.in_progress > 0 {
        tracing::warn!(
            batch_id,
            pending = counts.pending,
            in_progress = counts.in_progress,
            "items still outstanding; run `batch requeue` then process again"
        );
        return Ok(BatchStatus::InProgress);
    }

    let status = BatchStatus::settle(counts.completed, counts.failed);
    let batch = finish_batch(pool, batch_id, status, Utc::now()).await?;
    Ok(batch.status)
}

async fn resolve_outcome(
    pool: &SqlitePool,
    item: &BatchItemRow,
    outcome: AnalyzeOutcome,
    before: NaiveDateTime,
    config: &ProcessorConfig,
) -> Result<ItemResolution, BatchError> {
    match outcome {
        AnalyzeOutcome::TimedOut { after } => Ok(ItemResolution::Failed {
            error: format!("timeout after {}s", after.as_secs()),
        }),
        AnalyzeOutcome::Failed { exit_code, stderr } => Ok(ItemResolution::Failed {
            error: failure_message(exit_code, &stderr, config.stderr_limit),
        }),
        AnalyzeOutcome::Succeeded { stdout } => {
            if let Some(search_id) = reported_search_id(&stdout) {
                return Ok(ItemResolution::Completed {
                    search_id: Some(search_id),
                    note: None,
                });
            }

            if !config.settle_delay.is_zero() {
                tokio::time::sleep(config.settle_delay).await;
            }

            // Weak link: assumes no other run searched the same keyword
            // since `before`.
            let search_id = find_latest_search_after(pool, &item.search_term, before).await?;
            let note = search_id.is_none().then(|| NO_RESULTS_NOTE.to_string());
            Ok(ItemResolution::Completed { search_id, note })
        }
    }
}

/// Extracts a `search_id=<id>` line printed by the tool.
pub(crate) fn reported_search_id(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix("search_id="))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Error text for a nonzero exit: trimmed stderr cut to `limit` characters,
/// or the exit code when stderr is empty.
pub(crate) fn failure_message(exit_code: Option<i32>, stderr: &str, limit: usize) -> String {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.chars().take(limit).collect();
    }
    match exit_code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

fn lease_expiry(now: DateTime<Utc>, lease: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(lease)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reported_search_id_reads_marker_line() {
        let stdout = "Analyzing puzzle...\n  search_id=abc-123 \nDone\n";
        assert_eq!(reported_search_id(stdout).as_deref(), Some("abc-123"));
    }

    #[test]
    fn reported_search_id_absent_or_empty() {
        assert!(reported_search_id("Analyzing puzzle...\nDone\n").is_none());
        assert!(reported_search_id("search_id=\n").is_none());
        assert!(reported_search_id("").is_none());
    }

    #[test]
    fn failure_message_prefers_stderr() {
        assert_eq!(failure_message(Some(2), "  bad term\n", 200), "bad term");
    }

    #[test]
    fn failure_message_truncates_on_char_boundary() {
        let stderr = "é".repeat(300);
        let message = failure_message(Some(1), &stderr, 200);
        assert_eq!(message.chars().count(), 200);
    }

    #[test]
    fn failure_message_falls_back_to_exit_code() {
        assert_eq!(failure_message(Some(4), "", 200), "exit code 4");
        assert_eq!(failure_message(None, " \n", 200), "terminated by signal");
    }

    #[test]
    fn default_config_matches_documented_pacing() {
        let config = ProcessorConfig::default();
        assert_eq!(config.rate_limit, Duration::from_secs(2));
        assert_eq!(config.settle_delay, Duration::from_millis(500));
        assert_eq!(config.stderr_limit, 200);
    }

    #[test]
    fn lease_expiry_saturates_instead_of_overflowing() {
        let now = Utc::now();
        assert_eq!(
            lease_expiry(now, Duration::from_secs(300)),
            now + chrono::Duration::seconds(300)
        );
        assert_eq!(
            lease_expiry(now, Duration::from_secs(u64::MAX)),
            DateTime::<Utc>::MAX_UTC
        );
    }
}
