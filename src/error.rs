//! Error types for headmark library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for headmark operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while building training data, training, or
/// extracting outlines.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV (de)serialization error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// No ground-truth annotation exists for a document.
    #[error("No ground truth for document: {0}")]
    MissingGroundTruth(String),

    /// A document produced no text lines.
    #[error("No text lines in document: {0}")]
    EmptyDocument(String),

    /// No persisted model exists and retraining is disabled.
    #[error("Model not available at {}", .0.display())]
    ModelUnavailable(PathBuf),

    /// Training was attempted without any labeled examples.
    #[error("Training data is empty")]
    TrainingDataEmpty,

    /// Training examples carried no labels to learn.
    #[error("Label vocabulary is empty")]
    EmptyLabelVocabulary,

    /// A feature vector does not match the layout the model was trained on.
    #[error("Feature mismatch: model expects {expected} features, got {found}")]
    FeatureMismatch {
        /// Dimensionality the model was trained with
        expected: usize,
        /// Dimensionality presented at prediction time
        found: usize,
    },

    /// A model was built against a different feature schema version.
    #[error("Feature schema mismatch: model uses v{model}, extractor is v{current}")]
    SchemaMismatch {
        /// Schema version stored in the model
        model: u32,
        /// Schema version of this build
        current: u32,
    },

    /// A model bundle is structurally invalid.
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// A label is not part of the model's vocabulary.
    #[error("Unknown label: {0}")]
    UnknownLabel(String),

    /// Error in the layout dump format.
    #[error("Layout error: {0}")]
    Layout(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error only affects the current document in a batch.
    ///
    /// Recoverable errors are logged and the document is skipped; all other
    /// errors abort the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::MissingGroundTruth(_) | Error::EmptyDocument(_) | Error::Layout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::TrainingDataEmpty;
        assert_eq!(err.to_string(), "Training data is empty");

        let err = Error::FeatureMismatch {
            expected: 27,
            found: 8,
        };
        assert_eq!(
            err.to_string(),
            "Feature mismatch: model expects 27 features, got 8"
        );

        let err = Error::ModelUnavailable(PathBuf::from("models/rf.json"));
        assert_eq!(err.to_string(), "Model not available at models/rf.json");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_recoverable() {
        assert!(Error::MissingGroundTruth("a".into()).is_recoverable());
        assert!(Error::EmptyDocument("a".into()).is_recoverable());
        assert!(!Error::TrainingDataEmpty.is_recoverable());
        assert!(!Error::FeatureMismatch {
            expected: 27,
            found: 3
        }
        .is_recoverable());
    }
}
