//! Read-only assembly of a batch's results for export.
//!
//! The output mirrors what the dashboard consumes: batch `metadata`, one
//! `results` entry per completed keyword with the apps and summary the
//! analysis tool stored, and a `failed` list for everything else.

use chrono::{DateTime, Utc};
use kwrank_core::{BatchStatus, ItemStatus};
use kwrank_db::{
    get_batch, get_keyword, get_report, get_search_summary, list_apps_for_search, list_items,
    AppRow, BatchItemRow, DbError, KeywordRow, SearchSummaryRow,
};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::BatchError;

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub metadata: BatchReportMetadata,
    pub results: Vec<KeywordResult>,
    pub failed: Vec<FailedKeyword>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReportMetadata {
    pub generated: DateTime<Utc>,
    pub batch_id: i64,
    pub status: BatchStatus,
    pub data_month: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub total_keywords: i64,
    pub successful: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_formatted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_rate: Option<String>,
}

/// The keyword as it appeared in the imported report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordInput {
    pub search_term: String,
    pub genre: String,
    pub country: String,
    pub month: String,
    pub rank_in_genre: i64,
    pub popularity_genre: i64,
    pub popularity_overall: i64,
    pub score_rank: i64,
    pub score_genre: i64,
    pub score_overall: i64,
    pub total_score: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordResult {
    pub input: KeywordInput,
    pub analysis: Analysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Analysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_id: Option<String>,
    pub apps: Vec<AppResult>,
    pub summary: Option<SearchSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppResult {
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
    pub genre: Option<String>,
    pub version: Option<String>,
    pub age_rating: Option<String>,
    pub minimum_os_version: Option<String>,
}

impl From<AppRow> for AppResult {
    fn from(row: AppRow) -> Self {
        Self {
            rank: row.rank,
            app_id: row.app_id,
            title: row.title,
            rating: row.rating,
            rating_count: row.rating_count,
            original_release: row.original_release,
            latest_release: row.latest_release,
            age_days: row.age_days,
            freshness_days: row.freshness_days,
            title_match_score: row.title_match_score,
            description_match_score: row.description_match_score,
            ratings_per_day: row.ratings_per_day,
            genre: row.genre_name,
            version: row.version,
            age_rating: row.age_rating,
            minimum_os_version: row.minimum_os_version,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchSummary {
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
    pub competitiveness_v1: Option<f64>,
}

impl From<SearchSummaryRow> for SearchSummary {
    fn from(row: SearchSummaryRow) -> Self {
        Self {
            avg_age_days: row.avg_age_days,
            median_age_days: row.median_age_days,
            age_ratio: row.age_ratio,
            avg_freshness_days: row.avg_freshness_days,
            avg_rating: row.avg_rating,
            avg_rating_count: row.avg_rating_count,
            avg_title_match_score: row.avg_title_match_score,
            avg_description_match_score: row.avg_description_match_score,
            avg_ratings_per_day: row.avg_ratings_per_day,
            newest_velocity: row.newest_velocity,
            established_velocity: row.established_velocity,
            velocity_ratio: row.velocity_ratio,
            competitiveness_v1: row.competitiveness_v1,
        }
    }
}

/// A keyword that did not complete: failed, or still pending / in flight.
#[derive(Debug, Clone, Serialize)]
pub struct FailedKeyword {
    pub keyword: String,
    pub status: ItemStatus,
    pub input: KeywordInput,
    pub error: Option<String>,
}

/// Builds the report for a batch.
///
/// # Errors
///
/// Returns [`BatchError::NotFound`] for an unknown batch or
/// [`BatchError::Db`] on a store failure.
pub async fn build_batch_report(pool: &SqlitePool, batch_id: i64) -> Result<BatchReport, BatchError> {
    let batch = get_batch(pool, batch_id).await.map_err(|e| match e {
        DbError::NotFound => BatchError::NotFound(batch_id),
        other => BatchError::Db(other),
    })?;
    let report = get_report(pool, batch.report_id).await?;
    let items = list_items(pool, batch_id).await?;

    let mut results = Vec::new();
    let mut failed = Vec::new();

    for item in items {
        let keyword = match item.keyword_id {
            Some(id) => get_keyword(pool, id).await?,
            None => None,
        };
        let input = keyword_input(&item, keyword.as_ref(), &report.data_month);

        if item.status == ItemStatus::Completed {
            let analysis = match item.search_id.as_deref() {
                Some(search_id) => load_analysis(pool, search_id).await?,
                None => Analysis::default(),
            };
            results.push(KeywordResult {
                input,
                analysis,
                note: item.error_message,
            });
        } else {
            failed.push(FailedKeyword {
                keyword: item.search_term,
                status: item.status,
                input,
                error: item.error_message,
            });
        }
    }

    let metadata = BatchReportMetadata {
        generated: Utc::now(),
        batch_id,
        status: batch.status,
        data_month: report.data_month,
        notes: batch.notes,
        total_keywords: batch.total_items,
        successful: results.len(),
        failed: failed.len(),
        started_at: batch.started_at,
        completed_at: batch.completed_at,
        duration_seconds: batch.duration_seconds,
        duration_formatted: batch.duration_seconds.map(format_duration),
        processing_rate: batch
            .duration_seconds
            .and_then(|secs| processing_rate(batch.total_items, secs)),
    };

    tracing::debug!(
        batch_id,
        successful = metadata.successful,
        failed = metadata.failed,
        "batch report assembled"
    );

    Ok(BatchReport {
        metadata,
        results,
        failed,
    })
}

async fn load_analysis(pool: &SqlitePool, search_id: &str) -> Result<Analysis, BatchError> {
    let apps = list_apps_for_search(pool, search_id)
        .await?
        .into_iter()
        .map(AppResult::from)
        .collect();
    let summary = get_search_summary(pool, search_id)
        .await?
        .map(SearchSummary::from);

    Ok(Analysis {
        search_id: Some(search_id.to_string()),
        apps,
        summary,
    })
}

/// Input data from the keyword row, or from the item itself with zero
/// scores when the keyword row is gone.
fn keyword_input(item: &BatchItemRow, keyword: Option<&KeywordRow>, month: &str) -> KeywordInput {
    match keyword {
        Some(kw) => KeywordInput {
            search_term: kw.search_term.clone(),
            genre: kw.genre.clone(),
            country: kw.country.clone(),
            month: month.to_string(),
            rank_in_genre: kw.rank_in_genre,
            popularity_genre: kw.popularity_genre,
            popularity_overall: kw.popularity_overall,
            score_rank: kw.score_rank,
            score_genre: kw.score_genre,
            score_overall: kw.score_overall,
            total_score: kw.total_score,
        },
        None => KeywordInput {
            search_term: item.search_term.clone(),
            genre: item.genre.clone(),
            country: item.country.clone(),
            month: month.to_string(),
            rank_in_genre: 0,
            popularity_genre: 0,
            popularity_overall: 0,
            score_rank: 0,
            score_genre: 0,
            score_overall: 0,
            total_score: 0,
        },
    }
}

/// `1h 2m 3s`, `2m 3s`, or `3s`.
#[must_use]
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Throughput as `"<n> keywords/hour"`; `None` for a zero duration.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn processing_rate(total_keywords: i64, duration_seconds: i64) -> Option<String> {
    if duration_seconds <= 0 {
        return None;
    }
    let rate = total_keywords as f64 / duration_seconds as f64 * 3600.0;
    Some(format!("{rate:.1} keywords/hour"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_formats() {
        assert_eq!(format_duration(3723), "1h 2m 3s");
        assert_eq!(format_duration(3600), "1h 0m 0s");
        assert_eq!(format_duration(123), "2m 3s");
        assert_eq!(format_duration(3), "3s");
        assert_eq!(format_duration(0), "0s");
    }

    #[test]
    fn rate_per_hour() {
        assert_eq!(processing_rate(10, 3600).as_deref(), Some("10.0 keywords/hour"));
        assert_eq!(processing_rate(3, 7).as_deref(), Some("1542.9 keywords/hour"));
        assert!(processing_rate(10, 0).is_none());
    }
}
