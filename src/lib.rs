//! # ngramvec - Subword Word Vectors
//!
//! ngramvec resolves any token, seen in training or not, to a dense vector.
//! Each vocabulary word owns a vector; every character n-gram of a word is
//! hashed (FNV-1a) into a fixed-size table of bucket vectors. A token's
//! vector is its own word vector (if any) plus the sum of its n-gram
//! bucket vectors, so unseen words still land near the words they share
//! n-grams with, while memory stays bounded by the bucket count.
//!
//! ## Core Concepts
//!
//! - **N-gram**: a run of `min_n..=max_n` characters of `<word>`
//! - **Bucket**: one row of the hash table, addressed by `fnv1a(ngram) % bucket_count`
//! - **Vocabulary**: words kept from the corpus, most frequent first
//! - **Trainer**: the strategy that fills the vector tables
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ngramvec::{Corpus, ModelConfig, NativeTrainer, SubwordModel};
//!
//! let corpus = Corpus::from_text("the night was dark\nthe nights were long");
//! let mut model = SubwordModel::new(ModelConfig::default().with_min_count(1))?;
//! model.build_vocabulary(&corpus)?;
//! model.train(&NativeTrainer::default(), &corpus)?;
//!
//! assert!(!model.in_vocabulary("nightly"));
//! assert!(model.has_vector("nightly"));
//! let sim = model.similarity("night", "nightly")?;
//!
//! model.save("night.ngv")?;
//! let reloaded = SubwordModel::load("night.ngv")?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod corpus;
pub mod error;
pub mod hash;
pub mod model;
pub mod ngram;
pub mod persistence;
pub mod similarity;
pub mod table;
pub mod trainer;
pub mod vocab;

// Re-export primary types at crate root for convenience
pub use config::{ModelConfig, TrainConfig};
pub use corpus::Corpus;
pub use error::{
    ConfigError, LookupError, ModelError, NgramVecError, NgramVecResult, PersistenceError,
    TrainingError,
};
pub use hash::{bucket_index, fnv1a_32};
pub use model::{ModelState, SubwordModel};
pub use ngram::{extract_ngrams, extract_ngrams_with_markers};
pub use persistence::{load, save, save_vocabulary_only, Layout};
pub use similarity::{cosine_similarity, Neighbor};
pub use table::VectorTable;
pub use trainer::{
    ExternalProcessTrainer, ExternalTrainerConfig, NativeTrainer, TrainReport, Trainer,
    TrainingInput,
};
pub use vocab::{VocabEntry, Vocabulary};
