//! Custom error types for rustjournalrank.
//!
//! Only a missing required column aborts a run. Malformed fields and
//! unresolvable identifiers are recovered where they occur and never reach
//! this type.

use thiserror::Error;

/// Main error type for rustjournalrank operations.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading/writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required column is absent from an input table
    #[error("{dataset} corpus is missing required column '{header}' (field: {field})")]
    MissingColumn {
        /// Which corpus was being loaded ("background" or "target")
        dataset: String,
        /// Logical field name
        field: String,
        /// Header string the mapping expected
        header: String,
    },

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A scoring component could not produce any usable output
    #[error("{component} failed for {affected} papers: {message}")]
    Component {
        component: String,
        affected: usize,
        message: String,
    },
}

/// Result type alias using `AnalysisError`
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a config error message
    fn ok_or_config(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_config(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| AnalysisError::Config(msg.to_string()))
    }
}
