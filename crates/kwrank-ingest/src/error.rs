use std::path::PathBuf;

use thiserror::Error;

/// Errors returned while reading or importing a keyword ranking export.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("file not found: {}", .0.display())]
    MissingFile(PathBuf),

    /// Extension is not one of the supported spreadsheet or delimited formats.
    #[error("unsupported file type: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("delimited file error: {0}")]
    Csv(#[from] csv::Error),

    /// The preamble is missing a field or carries an unparsable timestamp.
    #[error("report metadata: {0}")]
    Metadata(String),

    /// No header row, or a required column is absent.
    #[error("report layout: {0}")]
    Schema(String),

    #[error(transparent)]
    Db(#[from] kwrank_db::DbError),
}
