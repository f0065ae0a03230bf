use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;
use kwrank_core::KeywordSelection;

/// Sub-commands available under `keywords`.
#[derive(Debug, Subcommand)]
pub enum KeywordsCommands {
    /// Show the highest-scoring keywords of a report
    Top {
        /// Country to list (defaults to KWRANK_COUNTRY_FILTER)
        #[arg(long)]
        country: Option<String>,
        /// Report to read (defaults to the newest active report for the country)
        #[arg(long)]
        report_id: Option<i64>,
        /// Minimum total score (0-12)
        #[arg(long, default_value = "0")]
        min_score: i64,
        /// Maximum number of keywords to show
        #[arg(long, default_value = "50")]
        limit: u32,
        /// Also write the keywords as a selection file for `batch create`
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Print the top keywords of a report and optionally export them as a
/// selection file.
///
/// # Errors
///
/// Returns an error if no report matches, the query fails, or the output
/// file cannot be written.
pub(crate) async fn run_keywords_top(
    pool: &sqlx::SqlitePool,
    country: &str,
    report_id: Option<i64>,
    min_score: i64,
    limit: u32,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let report = match report_id {
        Some(id) => kwrank_db::get_report(pool, id)
            .await
            .with_context(|| format!("report {id} not found"))?,
        None => kwrank_db::find_latest_active_report(pool, country)
            .await?
            .ok_or_else(|| {
                anyhow::anyhow!("no active report holds keywords for '{country}'; run `import` first")
            })?,
    };

    let keywords =
        kwrank_db::list_top_keywords(pool, report.id, country, min_score, i64::from(limit)).await?;

    if keywords.is_empty() {
        println!(
            "no keywords with score >= {min_score} for {country} in report #{}",
            report.id
        );
        return Ok(());
    }

    println!(
        "Report #{} ({}, {}) \u{2014} {country}",
        report.id, report.data_month, report.user_locale
    );
    println!();
    println!(
        "{:>5}  {:>5}{:>5}{:>5}  {:<24}SEARCH TERM",
        "SCORE", "RANK", "GPOP", "OPOP", "GENRE"
    );
    for kw in &keywords {
        println!(
            "{:>5}  {:>5}{:>5}{:>5}  {:<24}{}",
            kw.total_score,
            kw.rank_in_genre,
            kw.popularity_genre,
            kw.popularity_overall,
            kw.genre,
            kw.search_term
        );
    }

    if let Some(path) = output {
        let selection: Vec<KeywordSelection> = keywords
            .into_iter()
            .map(|kw| KeywordSelection {
                search_term: kw.search_term,
                genre: kw.genre,
                country: Some(kw.country),
                month: Some(report.data_month.clone()),
                rank_in_genre: Some(kw.rank_in_genre),
                popularity_genre: Some(kw.popularity_genre),
                popularity_overall: Some(kw.popularity_overall),
                total_score: Some(kw.total_score),
            })
            .collect();
        let json = serde_json::to_string_pretty(&selection)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!();
        println!(
            "wrote {} keywords to {}; run `batch create {}`",
            selection.len(),
            path.display(),
            path.display()
        );
    }

    Ok(())
}
