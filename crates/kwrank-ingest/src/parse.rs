//! Turns the rows of a Search Ads keyword ranking export into report metadata
//! and scored keywords.
//!
//! The export starts with a free-form preamble, e.g.
//!
//! ```text
//! Data extract produced by 93070_144880 on 10/13/2025 17:50
//!
//! Month = 2025-09
//!
//! userLocale = en_US
//!
//! Month | Country or Region | Genre | Search Term | Rank in Genre | ...
//! ```
//!
//! followed by the header row and one row per keyword. Preamble fields and the
//! header are located by content rather than fixed row numbers.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use kwrank_core::{KeywordMetrics, ReportMetadata, ScoredKeyword, UNRANKED};
use regex::Regex;

use crate::IngestError;

static PRODUCED_BY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)produced by\s+(\S+)\s+on\s+(\d{1,2}/\d{1,2}/\d{4}\s+\d{1,2}:\d{2})")
        .expect("valid produced-by regex")
});
static MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*Month\s*=\s*(\S+)").expect("valid month regex"));
static USER_LOCALE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*userLocale\s*=\s*(\S+)").expect("valid locale regex"));

const GENERATED_AT_FORMAT: &str = "%m/%d/%Y %H:%M";

pub(crate) const COL_MONTH: &str = "Month";
pub(crate) const COL_COUNTRY: &str = "Country or Region";
pub(crate) const COL_GENRE: &str = "Genre";
pub(crate) const COL_TERM: &str = "Search Term";
pub(crate) const COL_RANK: &str = "Rank in Genre";
pub(crate) const COL_POP_GENRE: &str = "Search Popularity in Genre (1-100)";
pub(crate) const COL_POP_OVERALL: &str = "Search Popularity (1-100)";
pub(crate) const COL_POP_SCALE: &str = "Search Popularity (1-5)";

/// Keywords read from the data rows of an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKeywords {
    pub keywords: Vec<ScoredKeyword>,
    /// Data rows after the header, including skipped ones.
    pub rows_read: usize,
    /// Rows without a search term or outside the country filter.
    pub rows_skipped: usize,
}

/// Column positions of the required fields in the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    country: usize,
    genre: usize,
    term: usize,
    rank: usize,
    pop_genre: usize,
    pop_overall: usize,
    pop_scale: usize,
}

impl Columns {
    fn resolve(header: &[String]) -> Result<Self, IngestError> {
        let find = |name: &str| {
            header
                .iter()
                .position(|cell| cell == name)
                .ok_or_else(|| IngestError::Schema(format!("missing required column '{name}'")))
        };

        find(COL_MONTH)?;
        Ok(Self {
            country: find(COL_COUNTRY)?,
            genre: find(COL_GENRE)?,
            term: find(COL_TERM)?,
            rank: find(COL_RANK)?,
            pop_genre: find(COL_POP_GENRE)?,
            pop_overall: find(COL_POP_OVERALL)?,
            pop_scale: find(COL_POP_SCALE)?,
        })
    }
}

/// Returns the index of the header row: the first row whose first cell is
/// `Month` and which also names a `Search Term` column.
#[must_use]
pub fn find_header_row(rows: &[Vec<String>]) -> Option<usize> {
    rows.iter().position(|row| {
        row.first().is_some_and(|cell| cell == COL_MONTH) && row.iter().any(|c| c == COL_TERM)
    })
}

/// Reads report identity from the preamble (every row before the header, or
/// the whole sheet if no header exists).
///
/// # Errors
///
/// Returns [`IngestError::Metadata`] when the report id, timestamp, month, or
/// locale cannot be found, or the timestamp does not parse.
pub fn parse_metadata(rows: &[Vec<String>]) -> Result<ReportMetadata, IngestError> {
    let preamble = &rows[..find_header_row(rows).unwrap_or(rows.len())];

    let mut produced: Option<(String, String)> = None;
    let mut data_month: Option<String> = None;
    let mut user_locale: Option<String> = None;

    for cell in preamble.iter().flatten() {
        if produced.is_none() {
            if let Some(caps) = PRODUCED_BY.captures(cell) {
                produced = Some((caps[1].to_string(), caps[2].to_string()));
                continue;
            }
        }
        if data_month.is_none() {
            if let Some(caps) = MONTH.captures(cell) {
                data_month = Some(caps[1].to_string());
                continue;
            }
        }
        if user_locale.is_none() {
            if let Some(caps) = USER_LOCALE.captures(cell) {
                user_locale = Some(caps[1].to_string());
            }
        }
    }

    let (external_report_id, raw_timestamp) = produced.ok_or_else(|| {
        IngestError::Metadata("missing 'Data extract produced by <id> on <date>' line".to_string())
    })?;
    let generated_at = NaiveDateTime::parse_from_str(&raw_timestamp, GENERATED_AT_FORMAT)
        .map_err(|e| IngestError::Metadata(format!("invalid timestamp '{raw_timestamp}': {e}")))?;
    let data_month =
        data_month.ok_or_else(|| IngestError::Metadata("missing 'Month = ' line".to_string()))?;
    let user_locale = user_locale
        .ok_or_else(|| IngestError::Metadata("missing 'userLocale = ' line".to_string()))?;

    Ok(ReportMetadata {
        external_report_id,
        generated_at,
        data_month,
        user_locale,
    })
}

/// Scores every data row below the header.
///
/// Rows without a search term are skipped, as are rows for other countries
/// when `country_filter` is set. Numeric cells that are missing or invalid
/// fall back to 0, or to [`UNRANKED`] for the rank.
///
/// # Errors
///
/// Returns [`IngestError::Schema`] if there is no header row or a required
/// column is missing.
pub fn parse_keywords(
    rows: &[Vec<String>],
    country_filter: Option<&str>,
) -> Result<ParsedKeywords, IngestError> {
    let header_idx = find_header_row(rows)
        .ok_or_else(|| IngestError::Schema("no header row starting with 'Month'".to_string()))?;
    let columns = Columns::resolve(&rows[header_idx])?;

    let data = &rows[header_idx + 1..];
    let mut keywords = Vec::with_capacity(data.len());
    let mut rows_skipped = 0usize;

    for row in data {
        let cell = |idx: usize| row.get(idx).map_or("", String::as_str);

        let term = cell(columns.term);
        if term.is_empty() {
            rows_skipped += 1;
            continue;
        }

        let country = cell(columns.country);
        if country_filter.is_some_and(|wanted| wanted != country) {
            rows_skipped += 1;
            continue;
        }

        let metrics = KeywordMetrics {
            rank_in_genre: parse_metric(cell(columns.rank)).unwrap_or(UNRANKED),
            popularity_genre: parse_metric(cell(columns.pop_genre)).unwrap_or(0),
            popularity_overall: parse_metric(cell(columns.pop_overall)).unwrap_or(0),
            popularity_scale: parse_metric(cell(columns.pop_scale)).unwrap_or(0),
        };

        keywords.push(ScoredKeyword::new(
            country.to_string(),
            cell(columns.genre).to_string(),
            term.to_string(),
            metrics,
        ));
    }

    Ok(ParsedKeywords {
        keywords,
        rows_read: data.len(),
        rows_skipped,
    })
}

/// Parses an integer metric. Integral floats (`"12.0"`) are accepted since
/// spreadsheet exports store every number as a float.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
pub(crate) fn parse_metric(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    let value = raw.parse::<f64>().ok()?;
    (value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15).then(|| value as i64)
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
