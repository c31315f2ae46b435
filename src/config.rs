//! Model and training hyperparameters.
//!
//! `ModelConfig` is fixed at model construction and persisted as the
//! file header; `TrainConfig` only drives the native trainer.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default vector dimensionality.
pub const DEFAULT_DIM: usize = 100;

/// Default number of n-gram hash buckets.
pub const DEFAULT_BUCKET_COUNT: usize = 2_000_000;

/// Default begin-of-word marker.
pub const DEFAULT_BOW: char = '<';

/// Default end-of-word marker.
pub const DEFAULT_EOW: char = '>';

/// Hyperparameters that shape the vector space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Dimensionality D of every word and bucket vector.
    pub dim: usize,
    /// Shortest n-gram, in characters.
    pub min_n: usize,
    /// Longest n-gram, in characters. Zero disables subwords.
    pub max_n: usize,
    /// Number of hash buckets. Fixed for the lifetime of the model.
    pub bucket_count: usize,
    /// Marker prepended to a word before slicing.
    pub bow: char,
    /// Marker appended to a word before slicing.
    pub eow: char,
    /// Words seen fewer times than this are left out of the vocabulary.
    pub min_count: u64,
    /// Seed for the initial word and bucket vectors.
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dim: DEFAULT_DIM,
            min_n: 3,
            max_n: 6,
            bucket_count: DEFAULT_BUCKET_COUNT,
            bow: DEFAULT_BOW,
            eow: DEFAULT_EOW,
            min_count: 5,
            seed: 1,
        }
    }
}

impl ModelConfig {
    /// Validates the configuration, returning it unchanged on success.
    ///
    /// # Errors
    /// Returns `ConfigError` if any hyperparameter is out of range.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.dim == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        if self.bucket_count == 0 {
            return Err(ConfigError::ZeroBuckets);
        }
        if self.bow == self.eow {
            return Err(ConfigError::IdenticalMarkers { marker: self.bow });
        }
        for marker in [self.bow, self.eow] {
            if marker.is_alphanumeric() || marker.is_whitespace() {
                return Err(ConfigError::InvalidMarker { marker });
            }
        }
        Ok(self)
    }

    /// Returns true if this configuration produces any n-grams at all.
    #[must_use]
    pub const fn subwords_configured(&self) -> bool {
        self.max_n > 0 && self.max_n >= self.min_n
    }

    /// Sets the dimensionality.
    #[must_use]
    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = dim;
        self
    }

    /// Sets the n-gram length range.
    #[must_use]
    pub fn with_ngram_range(mut self, min_n: usize, max_n: usize) -> Self {
        self.min_n = min_n;
        self.max_n = max_n;
        self
    }

    /// Sets the bucket count.
    #[must_use]
    pub fn with_bucket_count(mut self, bucket_count: usize) -> Self {
        self.bucket_count = bucket_count;
        self
    }

    /// Sets the minimum word frequency.
    #[must_use]
    pub fn with_min_count(mut self, min_count: u64) -> Self {
        self.min_count = min_count;
        self
    }

    /// Sets the initialization seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the boundary markers.
    #[must_use]
    pub fn with_markers(mut self, bow: char, eow: char) -> Self {
        self.bow = bow;
        self.eow = eow;
        self
    }
}

/// Hyperparameters for the native trainer.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    /// Passes over the corpus.
    pub epochs: usize,
    /// Starting learning rate; decays linearly to zero.
    pub learning_rate: f32,
    /// Maximum context window on each side of the center word.
    pub window: usize,
    /// Negative samples drawn per positive pair.
    pub negatives: usize,
    /// Seed for negative sampling and window shrinking.
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 5,
            learning_rate: 0.05,
            window: 5,
            negatives: 5,
            seed: 1,
        }
    }
}

impl TrainConfig {
    /// Validates the configuration, returning it unchanged on success.
    ///
    /// # Errors
    /// Returns `ConfigError` if any hyperparameter is out of range.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.epochs == 0 {
            return Err(ConfigError::ZeroField { field: "epochs" });
        }
        if self.window == 0 {
            return Err(ConfigError::ZeroField { field: "window" });
        }
        if self.negatives == 0 {
            return Err(ConfigError::ZeroField { field: "negatives" });
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ConfigError::InvalidLearningRate {
                value: self.learning_rate,
            });
        }
        Ok(self)
    }
}
