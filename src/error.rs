//! Error types for ngramvec.
//!
//! All errors are strongly typed using thiserror, grouped by the area
//! that raises them. `NgramVecError` wraps every area so callers can
//! propagate with `?` and still match on the specific condition.

use thiserror::Error;

use crate::model::ModelState;

/// Errors raised while validating hyperparameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Dimensionality must be greater than zero")]
    ZeroDimension,

    #[error("Bucket count must be greater than zero")]
    ZeroBuckets,

    #[error("Boundary markers must differ (both are '{marker}')")]
    IdenticalMarkers {
        marker: char,
    },

    #[error("Boundary marker '{marker}' must not be alphanumeric or whitespace")]
    InvalidMarker {
        marker: char,
    },

    #[error("Field '{field}' must be greater than zero")]
    ZeroField {
        field: &'static str,
    },

    #[error("Learning rate {value} must be finite and positive")]
    InvalidLearningRate {
        value: f32,
    },
}

/// Errors raised by vector lookups and similarity queries.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("No vector for token '{token}': not in vocabulary and no n-gram resolves to a bucket")]
    NotFound {
        token: String,
    },

    #[error("Model is not ready for lookups (state: {state})")]
    NotReady {
        state: ModelState,
    },

    #[error("Vector has {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
    },

    #[error("Query must contain at least one word")]
    EmptyQuery,
}

/// Errors raised by a trainer.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Corpus contains no in-vocabulary tokens")]
    EmptyCorpus,

    #[error("Trainer process failed: {message}")]
    Process {
        message: String,
    },

    #[error("Malformed trainer output at line {line}: {message}")]
    Output {
        line: usize,
        message: String,
    },

    #[error("Trainer output word '{word}' does not match the finalized vocabulary")]
    VocabularyMismatch {
        word: String,
    },

    #[error("Trainer I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while saving or loading a model.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Model file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed model file: {reason}")]
    Malformed {
        reason: String,
    },
}

impl PersistenceError {
    /// Creates a malformed-file error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// Errors raised by model lifecycle transitions.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid model state: expected {expected}, found {actual}")]
    InvalidState {
        expected: ModelState,
        actual: ModelState,
    },

    #[error("Table '{table}' has {actual} rows, expected {expected}")]
    TableShape {
        table: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Word '{word}' appears more than once in the vocabulary")]
    DuplicateWord { word: String },
}

/// Top-level error type for ngramvec.
#[derive(Debug, Error)]
pub enum NgramVecError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Training error: {0}")]
    Training(#[from] TrainingError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

impl NgramVecError {
    /// Returns true if this is a lookup not-found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Lookup(LookupError::NotFound { .. }))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is a persistence error.
    #[must_use]
    pub const fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }

    /// Returns true if this error is retryable.
    ///
    /// Everything in this crate is local computation, so only raw I/O
    /// failures can change on a second attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Persistence(PersistenceError::Io(_)) | Self::Training(TrainingError::Io(_))
        )
    }
}

/// Result type alias for ngramvec operations.
pub type NgramVecResult<T> = Result<T, NgramVecError>;
