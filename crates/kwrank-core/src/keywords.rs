use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::scoring::{score_overall_popularity, score_popularity_in_genre, score_rank_in_genre};

/// Rank assigned to keywords the export leaves unranked.
pub const UNRANKED: i64 = 999;

/// Identity of one imported ranking snapshot, read from the export preamble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub external_report_id: String,
    pub generated_at: NaiveDateTime,
    pub data_month: String,
    pub user_locale: String,
}

impl ReportMetadata {
    /// Key under which at most one report may be active.
    #[must_use]
    pub fn month_locale_key(&self) -> String {
        format!("{}_{}", self.data_month, self.user_locale)
    }
}

/// Raw ranking metrics for one search term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordMetrics {
    pub rank_in_genre: i64,
    pub popularity_genre: i64,
    pub popularity_overall: i64,
    pub popularity_scale: i64,
}

/// A search term with its metrics and derived opportunity scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredKeyword {
    pub country: String,
    pub genre: String,
    pub search_term: String,
    pub rank_in_genre: i64,
    pub popularity_genre: i64,
    pub popularity_overall: i64,
    pub popularity_scale: i64,
    pub score_rank: i64,
    pub score_genre: i64,
    pub score_overall: i64,
    pub total_score: i64,
}

impl ScoredKeyword {
    #[must_use]
    pub fn new(country: String, genre: String, search_term: String, metrics: KeywordMetrics) -> Self {
        let score_rank = score_rank_in_genre(metrics.rank_in_genre);
        let score_genre = score_popularity_in_genre(metrics.popularity_genre);
        let score_overall = score_overall_popularity(metrics.popularity_overall);
        Self {
            country,
            genre,
            search_term,
            rank_in_genre: metrics.rank_in_genre,
            popularity_genre: metrics.popularity_genre,
            popularity_overall: metrics.popularity_overall,
            popularity_scale: metrics.popularity_scale,
            score_rank,
            score_genre,
            score_overall,
            total_score: score_rank + score_genre + score_overall,
        }
    }
}

/// One entry of a keyword selection file.
///
/// Selection files are produced by `keywords top --output` or by hand. Only
/// `search_term` and `genre` identify the keyword; `month` and `country` of
/// the first entry pick the report. Score fields are informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordSelection {
    pub search_term: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_in_genre: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity_genre: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity_overall: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_score: Option<i64>,
}
