use clap::Subcommand;

/// Sub-commands available under `reports`.
#[derive(Debug, Subcommand)]
pub enum ReportsCommands {
    /// List imported reports, newest first
    List {
        /// Include reports replaced by a newer import
        #[arg(long)]
        all: bool,
    },
}

/// Print imported reports.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_reports_list(pool: &sqlx::SqlitePool, all: bool) -> anyhow::Result<()> {
    let reports = kwrank_db::list_reports(pool, all).await?;

    if reports.is_empty() {
        println!("no reports found; run `import <file>` first");
        return Ok(());
    }

    println!(
        "{:<6}{:<18}{:<10}{:<9}{:<18}{:>9}  ACTIVE",
        "ID", "EXTERNAL ID", "MONTH", "LOCALE", "GENERATED", "KEYWORDS"
    );
    for report in &reports {
        println!(
            "{:<6}{:<18}{:<10}{:<9}{:<18}{:>9}  {}",
            report.id,
            report.external_report_id,
            report.data_month,
            report.user_locale,
            report.generated_at.format("%Y-%m-%d %H:%M"),
            report.total_keywords,
            if report.is_active { "yes" } else { "no" }
        );
    }

    Ok(())
}
