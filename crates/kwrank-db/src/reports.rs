//! Database operations for `reports`.

use chrono::{DateTime, NaiveDateTime, Utc};
use kwrank_core::{ReportMetadata, ScoredKeyword};
use sqlx::SqlitePool;

use crate::keywords::insert_keywords;
use crate::DbError;

const REPORT_COLUMNS: &str = "id, external_report_id, generated_at, data_month, user_locale, \
     month_locale_key, source_filename, total_keywords, is_active, imported_at";

/// A row from the `reports` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReportRow {
    pub id: i64,
    pub external_report_id: String,
    pub generated_at: NaiveDateTime,
    pub data_month: String,
    pub user_locale: String,
    pub month_locale_key: String,
    pub source_filename: String,
    pub total_keywords: i64,
    pub is_active: bool,
    pub imported_at: DateTime<Utc>,
}

/// Returns the id of a report already imported with the same external id and
/// generation timestamp.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_report_by_identity(
    pool: &SqlitePool,
    external_report_id: &str,
    generated_at: NaiveDateTime,
) -> Result<Option<i64>, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM reports WHERE external_report_id = ? AND generated_at = ?",
    )
    .bind(external_report_id)
    .bind(generated_at)
    .fetch_optional(pool)
    .await?;

    Ok(id)
}

/// Inserts a new active report with its keywords, deactivating every other
/// report that shares the same month + locale key.
///
/// Deactivation, the report insert, and the keyword bulk insert run in one
/// transaction; a failure anywhere leaves the previously active report in
/// place.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn insert_report_replacing_active(
    pool: &SqlitePool,
    metadata: &ReportMetadata,
    source_filename: &str,
    keywords: &[ScoredKeyword],
) -> Result<i64, DbError> {
    let month_locale_key = metadata.month_locale_key();
    let total_keywords = i64::try_from(keywords.len()).unwrap_or(i64::MAX);

    let mut tx = pool.begin().await?;

    let deactivated = sqlx::query(
        "UPDATE reports SET is_active = 0 WHERE month_locale_key = ? AND is_active = 1",
    )
    .bind(&month_locale_key)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let report_id: i64 = sqlx::query_scalar(
        "INSERT INTO reports \
             (external_report_id, generated_at, data_month, user_locale, month_locale_key, \
              source_filename, total_keywords, is_active, imported_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?) \
         RETURNING id",
    )
    .bind(&metadata.external_report_id)
    .bind(metadata.generated_at)
    .bind(&metadata.data_month)
    .bind(&metadata.user_locale)
    .bind(&month_locale_key)
    .bind(source_filename)
    .bind(total_keywords)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    insert_keywords(&mut tx, report_id, keywords).await?;

    tx.commit().await?;

    tracing::debug!(
        report_id,
        %month_locale_key,
        deactivated,
        total_keywords,
        "report stored"
    );

    Ok(report_id)
}

/// Fetches a single report by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_report(pool: &SqlitePool, id: i64) -> Result<ReportRow, DbError> {
    let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?");
    sqlx::query_as::<_, ReportRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Lists reports, newest generation first. Inactive reports are included
/// only when `include_inactive` is set.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reports(
    pool: &SqlitePool,
    include_inactive: bool,
) -> Result<Vec<ReportRow>, DbError> {
    let sql = format!(
        "SELECT {REPORT_COLUMNS} FROM reports \
         WHERE is_active = 1 OR ? \
         ORDER BY generated_at DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, ReportRow>(&sql)
        .bind(include_inactive)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Finds the newest active report for `data_month` that holds keywords for
/// `country`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_active_report_for(
    pool: &SqlitePool,
    data_month: &str,
    country: &str,
) -> Result<Option<ReportRow>, DbError> {
    let sql = format!(
        "SELECT {REPORT_COLUMNS} FROM reports r \
         WHERE r.data_month = ? AND r.is_active = 1 \
           AND EXISTS (SELECT 1 FROM keywords k WHERE k.report_id = r.id AND k.country = ?) \
         ORDER BY r.generated_at DESC, r.id DESC \
         LIMIT 1"
    );
    let row = sqlx::query_as::<_, ReportRow>(&sql)
        .bind(data_month)
        .bind(country)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Finds the most recently generated active report holding keywords for
/// `country`, across all months.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_latest_active_report(
    pool: &SqlitePool,
    country: &str,
) -> Result<Option<ReportRow>, DbError> {
    let sql = format!(
        "SELECT {REPORT_COLUMNS} FROM reports r \
         WHERE r.is_active = 1 \
           AND EXISTS (SELECT 1 FROM keywords k WHERE k.report_id = r.id AND k.country = ?) \
         ORDER BY r.generated_at DESC, r.id DESC \
         LIMIT 1"
    );
    let row = sqlx::query_as::<_, ReportRow>(&sql)
        .bind(country)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}
