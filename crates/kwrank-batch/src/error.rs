use thiserror::Error;

use crate::analyzer::AnalyzerError;

/// Errors returned by batch building, processing, and reporting.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("batch {0} not found")]
    NotFound(i64),

    /// The selection file is missing, malformed, or empty.
    #[error("invalid keyword selection: {0}")]
    Selection(String),

    #[error("no active report for {month} with keywords for {country}")]
    NoActiveReport { month: String, country: String },

    #[error("none of the {requested} selected keywords exist in report {report_id}")]
    NothingResolved { report_id: i64, requested: usize },

    /// Another process holds a live processing lease on the batch.
    #[error("batch {batch_id} is being processed by {holder}")]
    Claimed { batch_id: i64, holder: String },

    /// The processing lease expired and was taken over mid-run.
    #[error("lost the processing lease on batch {0}")]
    LeaseLost(i64),

    /// The analysis tool could not be run at all.
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),

    #[error(transparent)]
    Db(#[from] kwrank_db::DbError),
}
