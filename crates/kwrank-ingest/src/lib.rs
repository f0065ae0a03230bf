//! Reads Search Ads monthly keyword ranking exports and stores them as scored
//! reports.

pub mod error;
pub mod import;
pub mod parse;
pub mod sheet;

pub use error::IngestError;
pub use import::{import_report, ImportOutcome};
pub use parse::{find_header_row, parse_keywords, parse_metadata, ParsedKeywords};
pub use sheet::read_rows;
