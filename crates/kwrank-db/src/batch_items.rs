//! Database operations for `batch_items`.

use chrono::{DateTime, Utc};
use kwrank_core::ItemStatus;
use sqlx::SqlitePool;

use crate::batches::refresh_batch_counters;
use crate::DbError;

const ITEM_COLUMNS: &str = "id, batch_id, keyword_id, search_term, country, genre, status, \
     search_id, error_message, processed_at, created_at";

/// A row from the `batch_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BatchItemRow {
    pub id: i64,
    pub batch_id: i64,
    pub keyword_id: Option<i64>,
    pub search_term: String,
    pub country: String,
    pub genre: String,
    #[sqlx(try_from = "String")]
    pub status: ItemStatus,
    pub search_id: Option<String>,
    pub error_message: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Terminal result recorded for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemResolution {
    /// Tool succeeded. `search_id` is `None` when no result could be linked;
    /// `note` then explains why.
    Completed {
        search_id: Option<String>,
        note: Option<String>,
    },
    Failed {
        error: String,
    },
}

impl ItemResolution {
    #[must_use]
    pub fn status(&self) -> ItemStatus {
        match self {
            ItemResolution::Completed { .. } => ItemStatus::Completed,
            ItemResolution::Failed { .. } => ItemStatus::Failed,
        }
    }
}

/// Item counts per status for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct ItemCounts {
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub failed: i64,
}

impl ItemCounts {
    #[must_use]
    pub fn total(&self) -> i64 {
        self.pending + self.in_progress + self.completed + self.failed
    }
}

/// Returns every item of a batch in creation order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_items(pool: &SqlitePool, batch_id: i64) -> Result<Vec<BatchItemRow>, DbError> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM batch_items WHERE batch_id = ? ORDER BY id");
    let rows = sqlx::query_as::<_, BatchItemRow>(&sql)
        .bind(batch_id)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Returns the items of a batch in one status, in creation order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_items_by_status(
    pool: &SqlitePool,
    batch_id: i64,
    status: ItemStatus,
) -> Result<Vec<BatchItemRow>, DbError> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM batch_items WHERE batch_id = ? AND status = ? ORDER BY id"
    );
    let rows = sqlx::query_as::<_, BatchItemRow>(&sql)
        .bind(batch_id)
        .bind(status.as_str())
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Returns the items of a batch ordered for operator review: failures first,
/// then in-flight, pending, and completed items.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_items_for_status_view(
    pool: &SqlitePool,
    batch_id: i64,
) -> Result<Vec<BatchItemRow>, DbError> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM batch_items WHERE batch_id = ? \
         ORDER BY CASE status \
                      WHEN 'failed' THEN 1 \
                      WHEN 'in_progress' THEN 2 \
                      WHEN 'pending' THEN 3 \
                      ELSE 4 \
                  END, id"
    );
    let rows = sqlx::query_as::<_, BatchItemRow>(&sql)
        .bind(batch_id)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Counts the items of a batch per status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_items_by_status(pool: &SqlitePool, batch_id: i64) -> Result<ItemCounts, DbError> {
    let counts = sqlx::query_as::<_, ItemCounts>(
        "SELECT \
             COUNT(CASE WHEN status = 'pending' THEN 1 END)     AS pending, \
             COUNT(CASE WHEN status = 'in_progress' THEN 1 END) AS in_progress, \
             COUNT(CASE WHEN status = 'completed' THEN 1 END)   AS completed, \
             COUNT(CASE WHEN status = 'failed' THEN 1 END)      AS failed \
         FROM batch_items WHERE batch_id = ?",
    )
    .bind(batch_id)
    .fetch_one(pool)
    .await?;

    Ok(counts)
}

/// Moves a `pending` item to `in_progress`.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the item is not `pending`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_item_in_progress(pool: &SqlitePool, item_id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE batch_items SET status = 'in_progress' WHERE id = ? AND status = 'pending'",
    )
    .bind(item_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidTransition {
            entity: "batch item",
            id: item_id,
            expected: "pending",
        });
    }

    Ok(())
}

/// Records the terminal result of an `in_progress` item and refreshes the
/// owning batch's counters in the same transaction, so a crash never leaves
/// the counters behind the item rows.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the item is not `in_progress`, or
/// [`DbError::Sqlx`] if either update fails.
pub async fn finish_item(
    pool: &SqlitePool,
    batch_id: i64,
    item_id: i64,
    resolution: &ItemResolution,
    processed_at: DateTime<Utc>,
) -> Result<(), DbError> {
    let (search_id, message) = match resolution {
        ItemResolution::Completed { search_id, note } => (search_id.as_deref(), note.as_deref()),
        ItemResolution::Failed { error } => (None, Some(error.as_str())),
    };

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE batch_items \
         SET status = ?, search_id = ?, error_message = ?, processed_at = ? \
         WHERE id = ? AND batch_id = ? AND status = 'in_progress'",
    )
    .bind(resolution.status().as_str())
    .bind(search_id)
    .bind(message)
    .bind(processed_at)
    .bind(item_id)
    .bind(batch_id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidTransition {
            entity: "batch item",
            id: item_id,
            expected: "in_progress",
        });
    }

    refresh_batch_counters(&mut tx, batch_id).await?;

    tx.commit().await?;

    Ok(())
}

/// Returns an `in_progress` item to `pending` without recording a result.
///
/// Used when the analysis tool could not be started at all, so the item was
/// never actually attempted.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the item is not `in_progress`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn return_item_to_pending(pool: &SqlitePool, item_id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE batch_items SET status = 'pending' WHERE id = ? AND status = 'in_progress'",
    )
    .bind(item_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidTransition {
            entity: "batch item",
            id: item_id,
            expected: "in_progress",
        });
    }

    Ok(())
}

/// Resets every `in_progress` item of a batch to `pending` and refreshes the
/// batch counters. Returns the number of items requeued.
///
/// Terminal items are never touched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either update fails.
pub async fn requeue_in_progress_items(pool: &SqlitePool, batch_id: i64) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;

    let requeued = sqlx::query(
        "UPDATE batch_items SET status = 'pending' \
         WHERE batch_id = ? AND status = 'in_progress'",
    )
    .bind(batch_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    refresh_batch_counters(&mut tx, batch_id).await?;

    tx.commit().await?;

    Ok(requeued)
}
