//! Database operations for `batches`.
//!
//! Status changes are guarded updates: each transition names the state it
//! expects to leave, and a miss surfaces as [`DbError::InvalidTransition`]
//! instead of silently overwriting a concurrent writer's result.

use chrono::{DateTime, Utc};
use kwrank_core::BatchStatus;
use sqlx::{SqliteConnection, SqlitePool};

use crate::DbError;

const BATCH_COLUMNS: &str = "id, report_id, status, total_items, completed_items, failed_items, \
     notes, created_at, started_at, completed_at, duration_seconds, claimed_by, claim_expires_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `batches` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BatchRow {
    pub id: i64,
    pub report_id: i64,
    #[sqlx(try_from = "String")]
    pub status: BatchStatus,
    pub total_items: i64,
    pub completed_items: i64,
    pub failed_items: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub claimed_by: Option<String>,
    pub claim_expires_at: Option<DateTime<Utc>>,
}

impl BatchRow {
    /// Items neither completed nor failed.
    #[must_use]
    pub fn remaining_items(&self) -> i64 {
        (self.total_items - self.completed_items - self.failed_items).max(0)
    }

    /// Whether another process holds an unexpired lease at `now`.
    #[must_use]
    pub fn is_claimed_at(&self, now: DateTime<Utc>) -> bool {
        self.claimed_by.is_some() && self.claim_expires_at.is_some_and(|expires| expires > now)
    }
}

/// A batch joined with the report it was built from, for listings.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BatchListRow {
    pub id: i64,
    #[sqlx(try_from = "String")]
    pub status: BatchStatus,
    pub total_items: i64,
    pub completed_items: i64,
    pub failed_items: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub external_report_id: String,
    pub data_month: String,
    pub user_locale: String,
}

/// Input for one work item when materializing a batch.
#[derive(Debug, Clone)]
pub struct NewBatchItem {
    pub keyword_id: i64,
    pub search_term: String,
    pub country: String,
    pub genre: String,
}

// ---------------------------------------------------------------------------
// Creation and reads
// ---------------------------------------------------------------------------

/// Creates a `pending` batch and one `pending` item per entry of `items` in a
/// single transaction. `total_items` is the number of items actually written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; nothing is written in that
/// case.
pub async fn create_batch_with_items(
    pool: &SqlitePool,
    report_id: i64,
    notes: Option<&str>,
    items: &[NewBatchItem],
) -> Result<BatchRow, DbError> {
    let total_items = i64::try_from(items.len()).unwrap_or(i64::MAX);
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let sql = format!(
        "INSERT INTO batches (report_id, status, total_items, notes, created_at) \
         VALUES (?, 'pending', ?, ?, ?) \
         RETURNING {BATCH_COLUMNS}"
    );
    let batch = sqlx::query_as::<_, BatchRow>(&sql)
        .bind(report_id)
        .bind(total_items)
        .bind(notes)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

    for item in items {
        sqlx::query(
            "INSERT INTO batch_items \
                 (batch_id, keyword_id, search_term, country, genre, status, created_at) \
             VALUES (?, ?, ?, ?, ?, 'pending', ?)",
        )
        .bind(batch.id)
        .bind(item.keyword_id)
        .bind(&item.search_term)
        .bind(&item.country)
        .bind(&item.genre)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(batch)
}

/// Fetches a single batch by its `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_batch(pool: &SqlitePool, id: i64) -> Result<BatchRow, DbError> {
    let sql = format!("SELECT {BATCH_COLUMNS} FROM batches WHERE id = ?");
    sqlx::query_as::<_, BatchRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Returns the most recent `limit` batches, optionally restricted to one
/// status, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_batches(
    pool: &SqlitePool,
    status: Option<BatchStatus>,
    limit: i64,
) -> Result<Vec<BatchListRow>, DbError> {
    let rows = sqlx::query_as::<_, BatchListRow>(
        "SELECT b.id, b.status, b.total_items, b.completed_items, b.failed_items, b.notes, \
                b.created_at, r.external_report_id, r.data_month, r.user_locale \
         FROM batches b \
         JOIN reports r ON r.id = b.report_id \
         WHERE (? IS NULL OR b.status = ?) \
         ORDER BY b.created_at DESC, b.id DESC \
         LIMIT ?",
    )
    .bind(status.map(BatchStatus::as_str))
    .bind(status.map(BatchStatus::as_str))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Moves a batch to `in_progress`. A batch already `in_progress` (an
/// interrupted run being resumed) stays there; its original `started_at` is
/// kept so the final duration spans the whole batch.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the batch is already terminal or
/// missing, or [`DbError::Sqlx`] if the update fails.
pub async fn start_batch(
    pool: &SqlitePool,
    id: i64,
    now: DateTime<Utc>,
) -> Result<BatchRow, DbError> {
    let sql = format!(
        "UPDATE batches \
         SET status = 'in_progress', started_at = COALESCE(started_at, ?) \
         WHERE id = ? AND status IN ('pending', 'in_progress') \
         RETURNING {BATCH_COLUMNS}"
    );
    sqlx::query_as::<_, BatchRow>(&sql)
        .bind(now)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::InvalidTransition {
            entity: "batch",
            id,
            expected: "pending",
        })
}

/// Moves an `in_progress` batch to its terminal `status`, stamping
/// `completed_at` and the whole-second duration since `started_at`.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if `status` is not terminal or the
/// batch is not `in_progress`, or [`DbError::Sqlx`] if the update fails.
pub async fn finish_batch(
    pool: &SqlitePool,
    id: i64,
    status: BatchStatus,
    completed_at: DateTime<Utc>,
) -> Result<BatchRow, DbError> {
    let invalid = DbError::InvalidTransition {
        entity: "batch",
        id,
        expected: "in_progress",
    };
    if !status.is_terminal() {
        return Err(invalid);
    }

    let mut tx = pool.begin().await?;

    let started_at: Option<DateTime<Utc>> = sqlx::query_scalar(
        "SELECT started_at FROM batches WHERE id = ? AND status = 'in_progress'",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(invalid)?;

    let duration_seconds =
        started_at.map(|started| (completed_at - started).num_seconds().max(0));

    let sql = format!(
        "UPDATE batches \
         SET status = ?, completed_at = ?, duration_seconds = ? \
         WHERE id = ? AND status = 'in_progress' \
         RETURNING {BATCH_COLUMNS}"
    );
    let row = sqlx::query_as::<_, BatchRow>(&sql)
        .bind(status.as_str())
        .bind(completed_at)
        .bind(duration_seconds)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(row)
}

/// Recomputes `completed_items` and `failed_items` from the item rows.
///
/// Runs on the caller's connection so it can share a transaction with the
/// item update that changed the counts.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn refresh_batch_counters(conn: &mut SqliteConnection, id: i64) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE batches SET \
             completed_items = (SELECT COUNT(*) FROM batch_items \
                                WHERE batch_id = ?1 AND status = 'completed'), \
             failed_items    = (SELECT COUNT(*) FROM batch_items \
                                WHERE batch_id = ?1 AND status = 'failed') \
         WHERE id = ?1",
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Processing lease
// ---------------------------------------------------------------------------

/// Claims the processing lease for `holder` if the batch is unclaimed or the
/// previous lease expired before `now`. Returns `false` when another holder's
/// lease is still live.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn claim_batch(
    pool: &SqlitePool,
    id: i64,
    holder: &str,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE batches \
         SET claimed_by = ?, claim_expires_at = ? \
         WHERE id = ? \
           AND (claimed_by IS NULL \
                OR claim_expires_at IS NULL \
                OR julianday(claim_expires_at) <= julianday(?))",
    )
    .bind(holder)
    .bind(expires_at)
    .bind(id)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Extends a lease still held by `holder`. Returns `false` if the lease was
/// lost to another holder.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn renew_claim(
    pool: &SqlitePool,
    id: i64,
    holder: &str,
    expires_at: DateTime<Utc>,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE batches SET claim_expires_at = ? WHERE id = ? AND claimed_by = ?",
    )
    .bind(expires_at)
    .bind(id)
    .bind(holder)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Releases a lease held by `holder`. Releasing a lease that was already lost
/// is a no-op.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn release_claim(pool: &SqlitePool, id: i64, holder: &str) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE batches SET claimed_by = NULL, claim_expires_at = NULL \
         WHERE id = ? AND claimed_by = ?",
    )
    .bind(id)
    .bind(holder)
    .execute(pool)
    .await?;

    Ok(())
}
