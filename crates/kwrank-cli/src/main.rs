mod batch;
mod import;
mod keywords;
mod reports;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use batch::BatchCommands;
use keywords::KeywordsCommands;
use reports::ReportsCommands;

#[derive(Debug, Parser)]
#[command(name = "kwrank")]
#[command(about = "Search Ads keyword ranking import and batch analysis")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Import a monthly keyword ranking export (xlsx, xls, ods, csv, tsv)
    Import {
        /// Path to the export file
        file: PathBuf,
        /// Keep only rows for this country (defaults to KWRANK_COUNTRY_FILTER)
        #[arg(long, conflicts_with = "all_countries")]
        country: Option<String>,
        /// Import rows for every country
        #[arg(long)]
        all_countries: bool,
    },
    /// Imported ranking reports
    Reports {
        #[command(subcommand)]
        command: ReportsCommands,
    },
    /// Scored keywords of imported reports
    Keywords {
        #[command(subcommand)]
        command: KeywordsCommands,
    },
    /// Build, process, and report keyword analysis batches
    Batch {
        #[command(subcommand)]
        command: BatchCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check that the database is reachable
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = kwrank_core::load_app_config().context("failed to load configuration")?;
    init_tracing(&config.log_level);

    let Some(command) = cli.command else {
        println!("kwrank ready; run `kwrank --help` for commands");
        return Ok(());
    };

    let pool = kwrank_db::connect_pool(
        &config.database_url,
        kwrank_db::PoolConfig::from_app_config(&config),
    )
    .await
    .context("failed to open database")?;

    // Every command needs the schema; `db migrate` only reports what ran.
    let applied = kwrank_db::run_migrations(&pool)
        .await
        .context("failed to apply migrations")?;
    if applied > 0 {
        tracing::info!(applied, "migrations applied");
    }

    match command {
        Commands::Db { command } => match command {
            DbCommands::Migrate => println!("applied {applied} migration(s)"),
            DbCommands::Ping => {
                kwrank_db::health_check(&pool).await?;
                println!("database ok");
            }
        },
        Commands::Import {
            file,
            country,
            all_countries,
        } => {
            let filter = if all_countries {
                None
            } else {
                country.or_else(|| config.country_filter.clone())
            };
            import::run_import(&pool, &file, filter.as_deref()).await?;
        }
        Commands::Reports { command } => match command {
            ReportsCommands::List { all } => reports::run_reports_list(&pool, all).await?,
        },
        Commands::Keywords { command } => match command {
            KeywordsCommands::Top {
                country,
                report_id,
                min_score,
                limit,
                output,
            } => {
                let country = country
                    .or_else(|| config.country_filter.clone())
                    .context("no country given and KWRANK_COUNTRY_FILTER is empty")?;
                keywords::run_keywords_top(
                    &pool,
                    &country,
                    report_id,
                    min_score,
                    limit,
                    output.as_deref(),
                )
                .await?;
            }
        },
        Commands::Batch { command } => batch::run(&pool, &config, command).await?,
    }

    Ok(())
}

/// `RUST_LOG` wins when set; otherwise the configured level applies.
/// Logs go to stderr so tables and JSON on stdout stay clean.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Format an optional timestamp for display, returning `"—"` when `None`.
fn fmt_timestamp(ts: Option<chrono::DateTime<chrono::Utc>>) -> String {
    ts.map_or_else(
        || "\u{2014}".to_string(),
        |t| t.format("%Y-%m-%d %H:%M").to_string(),
    )
}
