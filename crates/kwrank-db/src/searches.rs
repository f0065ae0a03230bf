//! Read-only access to the tables written by the external analysis tool:
//! `searches`, `apps`, and `search_summaries`.

use chrono::NaiveDateTime;
use sqlx::SqlitePool;

use crate::DbError;

/// ISO-8601 without offset, the form the analysis tool writes.
const TOOL_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// One app row returned by a search, as recorded by the analysis tool.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppRow {
    pub rank: Option<i64>,
    pub app_id: Option<String>,
    pub title: Option<String>,
    pub rating: Option<f64>,
    pub rating_count: Option<i64>,
    pub original_release: Option<String>,
    pub latest_release: Option<String>,
    pub age_days: Option<i64>,
    pub freshness_days: Option<i64>,
    pub title_match_score: Option<i64>,
    pub description_match_score: Option<i64>,
    pub ratings_per_day: Option<f64>,
    pub genre_name: Option<String>,
    pub version: Option<String>,
    pub age_rating: Option<String>,
    pub minimum_os_version: Option<String>,
}

/// Aggregate statistics over all apps of one search.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchSummaryRow {
    pub search_id: String,
    pub avg_age_days: Option<f64>,
    pub median_age_days: Option<f64>,
    pub age_ratio: Option<f64>,
    pub avg_freshness_days: Option<f64>,
    pub avg_rating: Option<f64>,
    pub avg_rating_count: Option<f64>,
    pub avg_title_match_score: Option<f64>,
    pub avg_description_match_score: Option<f64>,
    pub avg_ratings_per_day: Option<f64>,
    pub newest_velocity: Option<f64>,
    pub established_velocity: Option<f64>,
    pub velocity_ratio: Option<f64>,
    #[sqlx(rename = "competitivenessV1")]
    pub competitiveness_v1: Option<f64>,
}

/// Finds the newest search for `keyword` recorded strictly after `after`.
///
/// This is how a tool run is tied back to the item that triggered it when the
/// tool does not report its own search id. The tool stamps searches with the
/// local wall clock and no offset, so `after` is a local naive time too.
/// Timestamps that do carry an offset (`Z` or `+HH:MM`) are shifted to local
/// time before comparing.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_latest_search_after(
    pool: &SqlitePool,
    keyword: &str,
    after: NaiveDateTime,
) -> Result<Option<String>, DbError> {
    let id = sqlx::query_scalar::<_, String>(
        "WITH stamped AS (\
             SELECT id, \
                    CASE WHEN length(timestamp) > 19 \
                          AND (timestamp LIKE '%Z' OR substr(timestamp, -6, 1) IN ('+', '-')) \
                         THEN julianday(timestamp, 'localtime') \
                         ELSE julianday(timestamp) END AS local_day \
             FROM searches WHERE keyword = ?\
         ) \
         SELECT id FROM stamped \
         WHERE local_day > julianday(?) \
         ORDER BY local_day DESC \
         LIMIT 1",
    )
    .bind(keyword)
    .bind(after.format(TOOL_TIMESTAMP_FORMAT).to_string())
    .fetch_optional(pool)
    .await?;

    Ok(id)
}

/// Returns the apps of a search in result-rank order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_apps_for_search(
    pool: &SqlitePool,
    search_id: &str,
) -> Result<Vec<AppRow>, DbError> {
    let rows = sqlx::query_as::<_, AppRow>(
        "SELECT rank, app_id, title, rating, rating_count, original_release, latest_release, \
                age_days, freshness_days, title_match_score, description_match_score, \
                ratings_per_day, genre_name, version, age_rating, minimum_os_version \
         FROM apps WHERE search_id = ? ORDER BY rank",
    )
    .bind(search_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the summary row of a search, if the tool wrote one.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_search_summary(
    pool: &SqlitePool,
    search_id: &str,
) -> Result<Option<SearchSummaryRow>, DbError> {
    let row = sqlx::query_as::<_, SearchSummaryRow>(
        "SELECT search_id, avg_age_days, median_age_days, age_ratio, avg_freshness_days, \
                avg_rating, avg_rating_count, avg_title_match_score, \
                avg_description_match_score, avg_ratings_per_day, newest_velocity, \
                established_velocity, velocity_ratio, competitivenessV1 \
         FROM search_summaries WHERE search_id = ?",
    )
    .bind(search_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
