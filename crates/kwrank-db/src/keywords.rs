//! Database operations for `keywords`.

use kwrank_core::ScoredKeyword;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::DbError;

/// Rows per multi-row INSERT; 12 binds each keeps well under SQLite's
/// host-parameter limit.
const INSERT_CHUNK_ROWS: usize = 500;

const KEYWORD_COLUMNS: &str = "id, report_id, country, genre, search_term, rank_in_genre, \
     popularity_genre, popularity_overall, popularity_scale, score_rank, score_genre, \
     score_overall, total_score";

/// A row from the `keywords` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KeywordRow {
    pub id: i64,
    pub report_id: i64,
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

/// Bulk-inserts scored keywords for `report_id` on an open connection or
/// transaction. Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails.
pub async fn insert_keywords(
    conn: &mut SqliteConnection,
    report_id: i64,
    keywords: &[ScoredKeyword],
) -> Result<u64, DbError> {
    let mut written = 0u64;

    for chunk in keywords.chunks(INSERT_CHUNK_ROWS) {
        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "INSERT INTO keywords (report_id, country, genre, search_term, rank_in_genre, \
             popularity_genre, popularity_overall, popularity_scale, score_rank, score_genre, \
             score_overall, total_score) ",
        );
        builder.push_values(chunk, |mut row, kw| {
            row.push_bind(report_id)
                .push_bind(&kw.country)
                .push_bind(&kw.genre)
                .push_bind(&kw.search_term)
                .push_bind(kw.rank_in_genre)
                .push_bind(kw.popularity_genre)
                .push_bind(kw.popularity_overall)
                .push_bind(kw.popularity_scale)
                .push_bind(kw.score_rank)
                .push_bind(kw.score_genre)
                .push_bind(kw.score_overall)
                .push_bind(kw.total_score);
        });
        written += builder.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(written)
}

/// Looks up a keyword by its natural key within a report.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_keyword(
    pool: &SqlitePool,
    report_id: i64,
    country: &str,
    search_term: &str,
    genre: &str,
) -> Result<Option<KeywordRow>, DbError> {
    let sql = format!(
        "SELECT {KEYWORD_COLUMNS} FROM keywords \
         WHERE report_id = ? AND country = ? AND search_term = ? AND genre = ? \
         ORDER BY id \
         LIMIT 1"
    );
    let row = sqlx::query_as::<_, KeywordRow>(&sql)
        .bind(report_id)
        .bind(country)
        .bind(search_term)
        .bind(genre)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Fetches a keyword by id, returning `None` when it no longer exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_keyword(pool: &SqlitePool, id: i64) -> Result<Option<KeywordRow>, DbError> {
    let sql = format!("SELECT {KEYWORD_COLUMNS} FROM keywords WHERE id = ?");
    let row = sqlx::query_as::<_, KeywordRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Returns the best-scoring keywords of a report for one country, highest
/// total first and better rank breaking ties.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_top_keywords(
    pool: &SqlitePool,
    report_id: i64,
    country: &str,
    min_score: i64,
    limit: i64,
) -> Result<Vec<KeywordRow>, DbError> {
    let sql = format!(
        "SELECT {KEYWORD_COLUMNS} FROM keywords \
         WHERE report_id = ? AND country = ? AND total_score >= ? \
         ORDER BY total_score DESC, rank_in_genre ASC, id ASC \
         LIMIT ?"
    );
    let rows = sqlx::query_as::<_, KeywordRow>(&sql)
        .bind(report_id)
        .bind(country)
        .bind(min_score)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Counts the keywords stored for a report.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_keywords(pool: &SqlitePool, report_id: i64) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM keywords WHERE report_id = ?")
        .bind(report_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}
