//! Error types for the medclass-ml crate.

use thiserror::Error;

/// Top-level error type for pipeline and training operations.
#[derive(Debug, Error)]
pub enum MlError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Feature extraction error: {0}")]
    FeatureExtraction(#[from] FeatureExtractionError),

    #[error("A training job is already running (run {run_id})")]
    JobAlreadyRunning { run_id: uuid::Uuid },

    #[error("No training job is running")]
    JobNotRunning,

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The run's task ended without producing a result (it panicked or was
    /// cancelled by the runtime).
    #[error("Training task aborted: {0}")]
    Aborted(String),
}

impl MlError {
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Problems with the shape or content of a loaded corpus.
///
/// Every variant names the offending columns and rows so the corpus can be
/// fixed without re-running the job to find the next problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required columns {missing:?}; columns found: {found:?}")]
    MissingColumns {
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("Corpus is empty")]
    EmptyCorpus,

    #[error("Column '{column}' must contain text; non-text values at rows {rows:?}")]
    NonTextColumn { column: String, rows: Vec<usize> },

    #[error("Column '{column}' has null values at rows {rows:?}")]
    NullValues { column: String, rows: Vec<usize> },

    #[error("Rows {rows:?} have no labels after splitting the group field")]
    EmptyLabels { rows: Vec<usize> },
}

/// Failures while turning text or labels into numeric features.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureExtractionError {
    #[error("Cannot extract {what} from an empty input collection")]
    EmptyInput { what: &'static str },

    #[error("max_features must be greater than zero")]
    InvalidMaxFeatures,

    #[error("Invalid n-gram range ({min}, {max})")]
    InvalidNgramRange { min: usize, max: usize },

    #[error("Invalid document-frequency bounds: min_df={min_df}, max_df={max_df}")]
    InvalidDocumentFrequency { min_df: usize, max_df: f64 },

    #[error("No terms remain after pruning; try a lower min_df or a higher max_df")]
    EmptyVocabulary,

    #[error("The {what} has not been fitted yet")]
    NotFitted { what: &'static str },

    #[error("Text features have {text} rows but metadata has {metadata}")]
    RowCountMismatch { text: usize, metadata: usize },

    #[error("Row {row} has {actual} columns, expected {expected}")]
    WidthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
}
