//! Turns a keyword selection file into a persisted batch.

use std::collections::HashSet;
use std::path::Path;

use kwrank_core::KeywordSelection;
use kwrank_db::{create_batch_with_items, find_active_report_for, find_keyword, NewBatchItem};
use sqlx::SqlitePool;

use crate::BatchError;

/// Result of building a batch from a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub batch_id: i64,
    pub report_id: i64,
    pub data_month: String,
    pub country: String,
    /// Entries in the selection.
    pub requested: usize,
    /// Items written to the batch.
    pub resolved: usize,
    /// Search terms that matched no keyword of the report.
    pub unmatched: Vec<String>,
}

/// Reads and validates a selection file.
///
/// # Errors
///
/// Returns [`BatchError::Selection`] if the file cannot be read, is not a
/// JSON array of selections, or is empty.
pub fn load_selection(path: &Path) -> Result<Vec<KeywordSelection>, BatchError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| BatchError::Selection(format!("cannot read {}: {e}", path.display())))?;
    let selections: Vec<KeywordSelection> = serde_json::from_str(&raw)
        .map_err(|e| BatchError::Selection(format!("{} is not valid: {e}", path.display())))?;
    if selections.is_empty() {
        return Err(BatchError::Selection(format!(
            "{} contains no keywords",
            path.display()
        )));
    }
    Ok(selections)
}

/// Creates a `pending` batch for the keywords named in `selections`.
///
/// The first entry's `month` and `country` pick the report: the newest
/// active report for that month holding keywords for that country. Entries
/// that do not match a keyword of that report (or name a different month)
/// are logged and listed in [`BuildOutcome::unmatched`]. Repeated entries
/// for the same keyword produce a single item.
///
/// # Errors
///
/// Returns [`BatchError::Selection`] if `selections` is empty or its first
/// entry lacks month or country, [`BatchError::NoActiveReport`] if no report
/// fits, [`BatchError::NothingResolved`] if no entry matches, or
/// [`BatchError::Db`] on a store failure. Nothing is written on error.
pub async fn create_batch_from_selection(
    pool: &SqlitePool,
    selections: &[KeywordSelection],
    notes: Option<&str>,
) -> Result<BuildOutcome, BatchError> {
    let first = selections
        .first()
        .ok_or_else(|| BatchError::Selection("selection is empty".to_string()))?;
    let (Some(month), Some(country)) = (first.month.as_deref(), first.country.as_deref()) else {
        return Err(BatchError::Selection(
            "first entry must name both month and country".to_string(),
        ));
    };

    let report = find_active_report_for(pool, month, country)
        .await?
        .ok_or_else(|| BatchError::NoActiveReport {
            month: month.to_string(),
            country: country.to_string(),
        })?;

    let mut items = Vec::with_capacity(selections.len());
    let mut seen = HashSet::new();
    let mut unmatched = Vec::new();

    for selection in selections {
        if selection.month.as_deref().is_some_and(|m| m != report.data_month) {
            tracing::warn!(
                term = %selection.search_term,
                month = ?selection.month,
                report_month = %report.data_month,
                "selection month differs from report; skipping"
            );
            unmatched.push(selection.search_term.clone());
            continue;
        }

        let keyword = find_keyword(
            pool,
            report.id,
            country,
            &selection.search_term,
            &selection.genre,
        )
        .await?;

        match keyword {
            Some(kw) => {
                if seen.insert(kw.id) {
                    items.push(NewBatchItem {
                        keyword_id: kw.id,
                        search_term: kw.search_term,
                        country: kw.country,
                        genre: kw.genre,
                    });
                } else {
                    tracing::debug!(term = %selection.search_term, "duplicate selection entry");
                }
            }
            None => {
                tracing::warn!(
                    term = %selection.search_term,
                    genre = %selection.genre,
                    report_id = report.id,
                    "keyword not found in report"
                );
                unmatched.push(selection.search_term.clone());
            }
        }
    }

    if items.is_empty() {
        return Err(BatchError::NothingResolved {
            report_id: report.id,
            requested: selections.len(),
        });
    }

    let batch = create_batch_with_items(pool, report.id, notes, &items).await?;

    tracing::info!(
        batch_id = batch.id,
        report_id = report.id,
        items = items.len(),
        unmatched = unmatched.len(),
        "batch created"
    );

    Ok(BuildOutcome {
        batch_id: batch.id,
        report_id: report.id,
        data_month: report.data_month,
        country: country.to_string(),
        requested: selections.len(),
        resolved: items.len(),
        unmatched,
    })
}

/// [`load_selection`] followed by [`create_batch_from_selection`].
///
/// # Errors
///
/// See both functions.
pub async fn create_batch_from_file(
    pool: &SqlitePool,
    path: &Path,
    notes: Option<&str>,
) -> Result<BuildOutcome, BatchError> {
    let selections = load_selection(path)?;
    create_batch_from_selection(pool, &selections, notes).await
}
