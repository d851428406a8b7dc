//! Error types for the scoring job.

use std::path::Path;
use thiserror::Error;

/// Boxed source error carried by [`ScoringError::Storage`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every fatal failure a scoring run can hit.
///
/// Out-of-range trip durations are not errors: the preparer drops those rows.
#[derive(Error, Debug)]
pub enum ScoringError {
    /// Malformed location template or bad configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// Model artifact missing, unreadable or inconsistent
    #[error("failed to load model from {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    /// Input unreadable, output unwritable, backend unreachable or table format unsupported
    #[error("storage error at {location}: {source}")]
    Storage {
        location: String,
        #[source]
        source: BoxError,
    },

    /// Model returned a different number of predictions than records
    #[error("model returned {got} predictions for {expected} records")]
    Prediction { expected: usize, got: usize },
}

impl ScoringError {
    pub fn storage(location: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ScoringError::Storage {
            location: location.into(),
            source: source.into(),
        }
    }

    pub fn model_load(path: &Path, reason: impl ToString) -> Self {
        ScoringError::ModelLoad {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for scoring operations
pub type Result<T> = std::result::Result<T, ScoringError>;
