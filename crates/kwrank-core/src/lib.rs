//! Domain types, scoring bands, and configuration shared by every kwrank crate.

pub mod app_config;
pub mod config;
pub mod keywords;
pub mod scoring;
pub mod status;

use thiserror::Error;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use keywords::{KeywordMetrics, KeywordSelection, ReportMetadata, ScoredKeyword, UNRANKED};
pub use scoring::{score_overall_popularity, score_popularity_in_genre, score_rank_in_genre};
pub use status::{BatchStatus, ItemStatus};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid batch status: {0}")]
    InvalidBatchStatus(String),
    #[error("invalid item status: {0}")]
    InvalidItemStatus(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
