use std::path::Path;

/// Import one ranking export and print what was stored.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the write
/// fails. Nothing is stored in that case.
pub(crate) async fn run_import(
    pool: &sqlx::SqlitePool,
    file: &Path,
    country_filter: Option<&str>,
) -> anyhow::Result<()> {
    let outcome = kwrank_ingest::import_report(pool, file, country_filter).await?;
    let meta = &outcome.metadata;

    if outcome.already_imported {
        let stored = kwrank_db::count_keywords(pool, outcome.report_id).await?;
        println!(
            "report {} generated {} is already imported as #{} with {stored} keywords; nothing to do",
            meta.external_report_id, meta.generated_at, outcome.report_id
        );
        return Ok(());
    }

    println!("Report #{}", outcome.report_id);
    println!("  external id: {}", meta.external_report_id);
    println!("  generated:   {}", meta.generated_at.format("%Y-%m-%d %H:%M"));
    println!("  month:       {}", meta.data_month);
    println!("  locale:      {}", meta.user_locale);
    println!(
        "  country:     {}",
        country_filter.unwrap_or("all countries")
    );
    println!(
        "  keywords:    {} imported from {} rows ({} skipped)",
        outcome.keywords_imported, outcome.rows_read, outcome.rows_skipped
    );

    if outcome.keywords_imported == 0 {
        eprintln!("warning: no keywords matched; check the country filter");
    }

    Ok(())
}
