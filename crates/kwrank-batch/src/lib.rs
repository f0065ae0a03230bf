//! Keyword analysis batches: building them from a selection, driving the
//! external analysis tool over their items, and reporting the results.

pub mod analyzer;
pub mod builder;
pub mod error;
pub mod processor;
pub mod report;

pub use analyzer::{AnalyzeOutcome, Analyzer, AnalyzerError, SubprocessAnalyzer};
pub use builder::{create_batch_from_file, create_batch_from_selection, load_selection, BuildOutcome};
pub use error::BatchError;
pub use processor::{
    process_batch, requeue_stuck_items, ProcessSummary, ProcessorConfig, NO_RESULTS_NOTE,
};
pub use report::{build_batch_report, format_duration, processing_rate, BatchReport};
