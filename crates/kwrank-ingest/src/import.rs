//! Imports an export file into the store.

use std::path::Path;

use kwrank_core::ReportMetadata;
use kwrank_db::{find_report_by_identity, insert_report_replacing_active};
use sqlx::SqlitePool;

use crate::parse::{parse_keywords, parse_metadata};
use crate::sheet::read_rows;
use crate::IngestError;

/// Result of one import call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub report_id: i64,
    /// The same report (external id + generation time) was already stored;
    /// nothing was written.
    pub already_imported: bool,
    pub metadata: ReportMetadata,
    pub keywords_imported: usize,
    pub rows_read: usize,
    pub rows_skipped: usize,
}

/// Imports the export at `path`, keeping only rows for `country_filter` when
/// it is set.
///
/// Re-importing a report that is already stored is a no-op returning the
/// existing id. Otherwise the new report becomes the active one for its
/// month + locale and every earlier report for that key is deactivated.
///
/// # Errors
///
/// Returns an [`IngestError`] if the file cannot be read, its preamble or
/// header is malformed, or the store rejects the write. Nothing is written
/// in any of those cases.
pub async fn import_report(
    pool: &SqlitePool,
    path: &Path,
    country_filter: Option<&str>,
) -> Result<ImportOutcome, IngestError> {
    let rows = read_rows(path)?;
    let metadata = parse_metadata(&rows)?;

    tracing::info!(
        external_report_id = %metadata.external_report_id,
        generated_at = %metadata.generated_at,
        data_month = %metadata.data_month,
        user_locale = %metadata.user_locale,
        "parsed report metadata"
    );

    if let Some(report_id) =
        find_report_by_identity(pool, &metadata.external_report_id, metadata.generated_at).await?
    {
        tracing::info!(report_id, "report already imported; skipping");
        return Ok(ImportOutcome {
            report_id,
            already_imported: true,
            metadata,
            keywords_imported: 0,
            rows_read: 0,
            rows_skipped: 0,
        });
    }

    let parsed = parse_keywords(&rows, country_filter)?;
    if parsed.keywords.is_empty() {
        tracing::warn!(
            country = country_filter.unwrap_or("<any>"),
            rows_read = parsed.rows_read,
            "no keywords matched; importing an empty report"
        );
    }

    let source_filename = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());

    let report_id =
        insert_report_replacing_active(pool, &metadata, &source_filename, &parsed.keywords).await?;

    tracing::info!(
        report_id,
        keywords = parsed.keywords.len(),
        rows_read = parsed.rows_read,
        rows_skipped = parsed.rows_skipped,
        "report imported"
    );

    Ok(ImportOutcome {
        report_id,
        already_imported: false,
        metadata,
        keywords_imported: parsed.keywords.len(),
        rows_read: parsed.rows_read,
        rows_skipped: parsed.rows_skipped,
    })
}
