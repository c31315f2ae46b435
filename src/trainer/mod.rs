//! Training strategies.
//!
//! A `Trainer` fills the word and bucket arenas of a model whose
//! vocabulary has been finalized. The arenas have a fixed shape; a trainer
//! may write any slot but never resizes them.
//!
//! Two strategies are provided:
//! - [`NativeTrainer`]: in-process skip-gram with negative sampling
//! - [`ExternalProcessTrainer`]: runs an external executable and reads the
//!   vectors it prints

mod external;
mod native;

pub use external::{ExternalProcessTrainer, ExternalTrainerConfig};
pub use native::NativeTrainer;

use crate::config::ModelConfig;
use crate::corpus::Corpus;
use crate::error::TrainingError;
use crate::table::VectorTable;
use crate::vocab::Vocabulary;

/// Read-only inputs handed to a trainer.
#[derive(Debug, Clone, Copy)]
pub struct TrainingInput<'a> {
    /// Tokenized training text.
    pub corpus: &'a Corpus,
    /// Finalized vocabulary; row `i` of the word table belongs to entry `i`.
    pub vocabulary: &'a Vocabulary,
    /// Model hyperparameters (dimension, n-gram range, bucket count).
    pub config: &'a ModelConfig,
}

/// Summary of a completed training run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainReport {
    /// Passes made over the corpus.
    pub epochs: usize,
    /// In-vocabulary tokens visited across all epochs. `0` when the trainer
    /// does not report a count.
    pub tokens_processed: u64,
    /// Mean loss over the last epoch. `NaN` when the trainer does not report loss.
    pub final_loss: f32,
}

/// Strategy that populates a model's vector arenas.
pub trait Trainer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Trains `words` (one row per vocabulary entry, in vocabulary order)
    /// and `buckets` (`config.bucket_count` rows).
    ///
    /// # Errors
    /// Returns a `TrainingError` if training cannot complete. The caller
    /// discards whatever was written to the arenas.
    fn train(
        &self,
        input: &TrainingInput<'_>,
        words: &mut VectorTable,
        buckets: &mut VectorTable,
    ) -> Result<TrainReport, TrainingError>;
}
