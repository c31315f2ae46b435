//! Bucketed hash embedding store.
//!
//! `SubwordModel` owns one vector per vocabulary word and one vector per
//! hash bucket. Any token resolves to a vector: its own word vector (if it
//! is in the vocabulary) plus the bucket vectors of its distinct character
//! n-grams. This is what lets unseen words participate in lookups and
//! similarity queries.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──build_vocabulary──▶ VocabularyBuilt ──train──▶ Trained
//!                                                         ▲
//!                                    from_parts / load ───┘
//! ```
//!
//! Only a `Trained` model answers lookups. Mutation needs `&mut self`; all
//! queries take `&self`, so a trained model can be shared across threads
//! behind an `Arc` with no locking.

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::config::ModelConfig;
use crate::corpus::Corpus;
use crate::error::{LookupError, ModelError, NgramVecResult, TrainingError};
use crate::hash::bucket_index;
use crate::ngram::extract_ngrams_with_markers;
use crate::table::VectorTable;
use crate::trainer::{TrainReport, Trainer, TrainingInput};
use crate::vocab::Vocabulary;

/// Lifecycle state of a `SubwordModel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelState {
    /// Constructed; no vocabulary, no vectors.
    Uninitialized,
    /// Vocabulary finalized and arenas initialized, not yet trained.
    VocabularyBuilt,
    /// Vectors populated. Read-only from here on.
    Trained,
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::VocabularyBuilt => "vocabulary-built",
            Self::Trained => "trained",
        };
        f.write_str(s)
    }
}

/// Distinct n-grams of `token` paired with their bucket indices.
///
/// Empty when the configuration disables subwords.
#[must_use]
pub fn ngram_buckets(token: &str, config: &ModelConfig) -> Vec<(String, usize)> {
    if !config.subwords_configured() {
        return Vec::new();
    }
    let mut seen = HashSet::new();
    extract_ngrams_with_markers(token, config.min_n, config.max_n, config.bow, config.eow)
        .into_iter()
        .filter(|g| seen.insert(g.clone()))
        .map(|g| {
            let idx = bucket_index(&g, config.bucket_count);
            (g, idx)
        })
        .collect()
}

/// Bucket indices of the distinct n-grams of `token`.
///
/// Two distinct n-grams that collide into one bucket both contribute.
#[must_use]
pub fn subword_buckets(token: &str, config: &ModelConfig) -> Vec<usize> {
    ngram_buckets(token, config).into_iter().map(|(_, idx)| idx).collect()
}

/// Word vectors with hashed character n-gram fallback.
#[derive(Debug)]
pub struct SubwordModel {
    config: ModelConfig,
    state: ModelState,
    vocab: Vocabulary,
    words: VectorTable,
    /// `None` once the bucket table has been discarded (vocabulary-only load).
    buckets: Option<VectorTable>,
    /// Unit-normalized `vector_for` of every vocabulary word, built on first
    /// similarity query.
    unit_cache: OnceLock<VectorTable>,
}

impl SubwordModel {
    /// Creates an empty, uninitialized model.
    ///
    /// # Errors
    /// Returns a configuration error if `config` does not validate.
    pub fn new(config: ModelConfig) -> NgramVecResult<Self> {
        let config = config.validate()?;
        Ok(Self {
            words: VectorTable::zeros(0, config.dim),
            config,
            state: ModelState::Uninitialized,
            vocab: Vocabulary::default(),
            buckets: None,
            unit_cache: OnceLock::new(),
        })
    }

    /// Assembles a trained model from tables produced elsewhere.
    ///
    /// `buckets` may be `None`, in which case lookups are vocabulary-only.
    ///
    /// # Errors
    /// Returns a configuration error for invalid hyperparameters, or a
    /// `TableShape` / `DimensionMismatch` error if the tables disagree with
    /// the configuration or the vocabulary.
    pub fn from_parts(
        config: ModelConfig,
        vocab: Vocabulary,
        words: VectorTable,
        buckets: Option<VectorTable>,
    ) -> NgramVecResult<Self> {
        let config = config.validate()?;
        check_shape("words", &words, vocab.len(), config.dim)?;
        if let Some(ref b) = buckets {
            check_shape("buckets", b, config.bucket_count, config.dim)?;
        }
        Ok(Self {
            config,
            state: ModelState::Trained,
            vocab,
            words,
            buckets,
            unit_cache: OnceLock::new(),
        })
    }

    /// Scans `corpus`, finalizes the vocabulary and initializes both arenas.
    ///
    /// # Errors
    /// Returns `InvalidState` unless the model is `Uninitialized`.
    pub fn build_vocabulary(&mut self, corpus: &Corpus) -> NgramVecResult<&Vocabulary> {
        self.expect_state(ModelState::Uninitialized)?;

        let vocab = Vocabulary::scan(corpus, self.config.min_count);
        info!(
            words = vocab.len(),
            tokens = corpus.token_count(),
            min_count = self.config.min_count,
            "vocabulary built"
        );
        if vocab.is_empty() {
            warn!("vocabulary is empty; every lookup will depend on subwords");
        }
        self.vocab = vocab;
        self.init_arenas();
        self.state = ModelState::VocabularyBuilt;
        Ok(&self.vocab)
    }

    /// Runs `trainer` over `corpus`, moving the model to `Trained`.
    ///
    /// On failure the arenas are reset to their initial values and the
    /// model stays `VocabularyBuilt`.
    ///
    /// # Errors
    /// Returns `InvalidState` unless the model is `VocabularyBuilt`, or the
    /// trainer's error.
    pub fn train(&mut self, trainer: &dyn Trainer, corpus: &Corpus) -> NgramVecResult<TrainReport> {
        self.expect_state(ModelState::VocabularyBuilt)?;
        if self.vocab.is_empty() {
            return Err(TrainingError::EmptyCorpus.into());
        }

        info!(trainer = trainer.name(), words = self.vocab.len(), "training started");
        let input = TrainingInput {
            corpus,
            vocabulary: &self.vocab,
            config: &self.config,
        };
        let buckets = self
            .buckets
            .as_mut()
            .ok_or_else(|| TrainingError::Process {
                message: "bucket table missing".to_string(),
            })?;

        match trainer.train(&input, &mut self.words, buckets) {
            Ok(report) => {
                info!(
                    trainer = trainer.name(),
                    epochs = report.epochs,
                    tokens = report.tokens_processed,
                    loss = report.final_loss,
                    "training finished"
                );
                self.state = ModelState::Trained;
                self.unit_cache = OnceLock::new();
                Ok(report)
            }
            Err(e) => {
                warn!(trainer = trainer.name(), error = %e, "training failed; resetting vectors");
                self.init_arenas();
                Err(e.into())
            }
        }
    }

    fn init_arenas(&mut self) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.words = VectorTable::uniform(self.vocab.len(), self.config.dim, &mut rng);
        self.buckets = Some(VectorTable::uniform(
            self.config.bucket_count,
            self.config.dim,
            &mut rng,
        ));
    }

    fn expect_state(&self, expected: ModelState) -> Result<(), ModelError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ModelError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    pub(crate) fn ensure_trained(&self) -> Result<(), LookupError> {
        if self.state == ModelState::Trained {
            Ok(())
        } else {
            Err(LookupError::NotReady { state: self.state })
        }
    }

    /// Resolves `token` to a vector.
    ///
    /// The result is the word's own vector (if in vocabulary) plus the sum
    /// of the bucket vectors of its distinct n-grams. The sum is not
    /// normalized. An all-zero result is returned as-is.
    ///
    /// # Errors
    /// - `NotReady` if the model is not trained
    /// - `NotFound` if the token is out of vocabulary and has no n-grams
    pub fn vector_for(&self, token: &str) -> Result<Vec<f32>, LookupError> {
        self.ensure_trained()?;

        let base = self.vocab.get(token);
        let buckets = self.active_buckets(token);

        let mut out = match base {
            Some(idx) => self.words.row(idx).to_vec(),
            None if buckets.is_empty() => {
                debug!(token, "no vector: out of vocabulary with no n-grams");
                return Err(LookupError::NotFound {
                    token: token.to_string(),
                });
            }
            None => vec![0.0; self.config.dim],
        };

        if let Some(table) = self.buckets.as_ref() {
            for idx in buckets {
                table.add_row_into(idx, &mut out);
            }
        }
        Ok(out)
    }

    fn active_buckets(&self, token: &str) -> Vec<usize> {
        if self.buckets.is_none() {
            return Vec::new();
        }
        subword_buckets(token, &self.config)
    }

    /// True iff `token` is an exact vocabulary entry.
    #[must_use]
    pub fn in_vocabulary(&self, token: &str) -> bool {
        self.vocab.contains(token)
    }

    /// True iff `vector_for(token)` would succeed.
    #[must_use]
    pub fn has_vector(&self, token: &str) -> bool {
        self.state == ModelState::Trained
            && (self.vocab.contains(token) || !self.active_buckets(token).is_empty())
    }

    /// Alias for [`has_vector`](Self::has_vector).
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.has_vector(token)
    }

    /// True if `token` resolves, but to an exactly zero vector, meaning none
    /// of its buckets (and no word vector) carry any signal.
    ///
    /// # Errors
    /// Same as [`vector_for`](Self::vector_for).
    pub fn is_untouched(&self, token: &str) -> Result<bool, LookupError> {
        Ok(self.vector_for(token)?.iter().all(|&x| x == 0.0))
    }

    /// The distinct n-grams of `token` and their buckets, as used by lookups.
    #[must_use]
    pub fn ngram_buckets(&self, token: &str) -> Vec<(String, usize)> {
        if self.buckets.is_none() {
            return Vec::new();
        }
        ngram_buckets(token, &self.config)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ModelState {
        self.state
    }

    /// Hyperparameters.
    #[must_use]
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Vector dimensionality.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.config.dim
    }

    /// The finalized vocabulary, most frequent word first.
    #[must_use]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// The raw per-word vectors (without n-gram contributions).
    #[must_use]
    pub fn word_vectors(&self) -> &VectorTable {
        &self.words
    }

    /// The bucket table, if it has not been discarded.
    #[must_use]
    pub fn bucket_vectors(&self) -> Option<&VectorTable> {
        self.buckets.as_ref()
    }

    /// Whether OOV tokens can resolve through n-grams.
    #[must_use]
    pub fn subwords_enabled(&self) -> bool {
        self.buckets.is_some() && self.config.subwords_configured()
    }

    pub(crate) fn unit_vectors(&self) -> Result<&VectorTable, LookupError> {
        self.ensure_trained()?;
        if let Some(table) = self.unit_cache.get() {
            return Ok(table);
        }
        let mut table = VectorTable::zeros(self.vocab.len(), self.config.dim);
        for (idx, entry) in self.vocab.iter().enumerate() {
            let mut v = self.vector_for(&entry.word)?;
            normalize(&mut v);
            table.row_mut(idx).copy_from_slice(&v);
        }
        debug!(words = table.rows(), "unit vector cache built");
        Ok(self.unit_cache.get_or_init(|| table))
    }
}

fn check_shape(
    table: &'static str,
    t: &VectorTable,
    rows: usize,
    dim: usize,
) -> Result<(), crate::error::NgramVecError> {
    if t.dim() != dim {
        return Err(LookupError::DimensionMismatch {
            expected: dim,
            actual: t.dim(),
        }
        .into());
    }
    if t.rows() != rows {
        return Err(ModelError::TableShape {
            table,
            expected: rows,
            actual: t.rows(),
        }
        .into());
    }
    Ok(())
}

/// Scales `v` to unit length in place. Zero vectors are left alone.
pub(crate) fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NgramVecError;

    fn small_config() -> ModelConfig {
        ModelConfig::default()
            .with_dim(8)
            .with_bucket_count(1024)
            .with_min_count(1)
    }

    fn model_from(config: ModelConfig, words: &[(&str, Vec<f32>)], buckets: VectorTable) -> SubwordModel {
        let vocab = Vocabulary::from_counts(words.iter().map(|(w, _)| (*w, 1)), 1);
        let rows: Vec<Vec<f32>> = words.iter().map(|(_, v)| v.clone()).collect();
        let table = VectorTable::from_rows(config.dim, &rows).unwrap();
        SubwordModel::from_parts(config, vocab, table, Some(buckets)).unwrap()
    }

    #[test]
    fn test_lookup_before_training_fails_loudly() {
        let mut model = SubwordModel::new(small_config()).unwrap();
        assert!(matches!(
            model.vector_for("night"),
            Err(LookupError::NotReady { state: ModelState::Uninitialized })
        ));
        model.build_vocabulary(&Corpus::from_text("night day")).unwrap();
        assert!(matches!(
            model.vector_for("night"),
            Err(LookupError::NotReady { state: ModelState::VocabularyBuilt })
        ));
        assert!(!model.has_vector("night"));
        assert!(model.in_vocabulary("night"));
    }

    #[test]
    fn test_build_vocabulary_twice_is_invalid() {
        let mut model = SubwordModel::new(small_config()).unwrap();
        model.build_vocabulary(&Corpus::from_text("a b")).unwrap();
        let err = model.build_vocabulary(&Corpus::from_text("a b")).unwrap_err();
        assert!(matches!(
            err,
            NgramVecError::Model(ModelError::InvalidState {
                expected: ModelState::Uninitialized,
                actual: ModelState::VocabularyBuilt,
            })
        ));
    }

    #[test]
    fn test_build_vocabulary_shapes_arenas() {
        let mut model = SubwordModel::new(small_config()).unwrap();
        model.build_vocabulary(&Corpus::from_text("a b c a")).unwrap();
        assert_eq!(model.word_vectors().rows(), 3);
        assert_eq!(model.bucket_vectors().unwrap().rows(), 1024);
        assert_eq!(model.word_vectors().dim(), 8);
    }

    #[test]
    fn test_vector_for_sums_word_and_distinct_buckets() {
        let config = small_config().with_dim(2);
        let mut buckets = VectorTable::zeros(1024, 2);
        for (_, idx) in ngram_buckets("ab", &config) {
            buckets.row_mut(idx)[0] += 1.0;
        }
        let model = model_from(config.clone(), &[("ab", vec![10.0, 1.0])], buckets);

        // "<ab>" yields "<ab", "ab>", "<ab>": three distinct n-grams.
        let grams = model.ngram_buckets("ab");
        assert_eq!(grams.len(), 3);

        let v = model.vector_for("ab").unwrap();
        let distinct_buckets: HashSet<usize> = grams.iter().map(|(_, i)| *i).collect();
        let expected_extra: f32 = grams
            .iter()
            .map(|(_, i)| model.bucket_vectors().unwrap().row(*i)[0])
            .sum();
        assert!(!distinct_buckets.is_empty());
        assert!((v[0] - (10.0 + expected_extra)).abs() < 1e-6);
        assert!((v[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_repeated_ngrams_count_once() {
        let config = small_config().with_dim(1).with_ngram_range(2, 2);
        let mut buckets = VectorTable::zeros(1024, 1);
        let aa = bucket_index("aa", 1024);
        buckets.row_mut(aa)[0] = 1.0;
        let model = model_from(config, &[("zz", vec![0.0])], buckets);

        // "<aaaa>" contains "aa" three times.
        let v = model.vector_for("aaaa").unwrap();
        let others: f32 = model
            .ngram_buckets("aaaa")
            .iter()
            .filter(|(g, _)| g != "aa")
            .map(|(_, i)| model.bucket_vectors().unwrap().row(*i)[0])
            .sum();
        assert!((v[0] - (1.0 + others)).abs() < 1e-6);
    }

    #[test]
    fn test_oov_resolves_through_buckets() {
        let config = small_config();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let buckets = VectorTable::uniform(1024, 8, &mut rng);
        let model = model_from(config, &[("night", vec![0.5; 8])], buckets);

        assert!(!model.in_vocabulary("nights"));
        assert!(model.has_vector("nights"));
        assert!(model.contains("nights"));
        assert_eq!(model.vector_for("nights").unwrap().len(), 8);
    }

    #[test]
    fn test_degenerate_config_is_plain_word_vectors() {
        let config = small_config().with_dim(3).with_ngram_range(3, 0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let buckets = VectorTable::uniform(1024, 3, &mut rng);
        let model = model_from(config, &[("night", vec![1.0, 2.0, 3.0])], buckets);

        assert_eq!(model.vector_for("night").unwrap(), vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            model.vector_for("nights"),
            Err(LookupError::NotFound { .. })
        ));
        assert!(!model.has_vector("nights"));
        assert!(!model.subwords_enabled());
    }

    #[test]
    fn test_untouched_buckets_give_valid_zero_vector() {
        let config = small_config().with_dim(4);
        let model = model_from(config, &[("night", vec![1.0; 4])], VectorTable::zeros(1024, 4));
        let v = model.vector_for("axe").unwrap();
        assert_eq!(v, vec![0.0; 4]);
        assert!(model.is_untouched("axe").unwrap());
        assert!(!model.is_untouched("night").unwrap());
    }

    #[test]
    fn test_vocabulary_only_model_rejects_oov() {
        let config = small_config().with_dim(2);
        let vocab = Vocabulary::from_counts([("night", 1)], 1);
        let words = VectorTable::from_rows(2, &[vec![1.0, 1.0]]).unwrap();
        let model = SubwordModel::from_parts(config, vocab, words, None).unwrap();

        assert_eq!(model.vector_for("night").unwrap(), vec![1.0, 1.0]);
        assert!(model.vector_for("nights").is_err());
        assert!(model.ngram_buckets("nights").is_empty());
    }

    #[test]
    fn test_from_parts_rejects_bad_shapes() {
        let config = small_config().with_dim(2);
        let vocab = Vocabulary::from_counts([("a", 1), ("b", 1)], 1);
        let words = VectorTable::zeros(1, 2);
        let err = SubwordModel::from_parts(config.clone(), vocab.clone(), words, None).unwrap_err();
        assert!(matches!(err, NgramVecError::Model(ModelError::TableShape { table: "words", .. })));

        let words = VectorTable::zeros(2, 3);
        let err = SubwordModel::from_parts(config.clone(), vocab.clone(), words, None).unwrap_err();
        assert!(matches!(err, NgramVecError::Lookup(LookupError::DimensionMismatch { .. })));

        let words = VectorTable::zeros(2, 2);
        let buckets = VectorTable::zeros(10, 2);
        let err = SubwordModel::from_parts(config, vocab, words, Some(buckets)).unwrap_err();
        assert!(matches!(err, NgramVecError::Model(ModelError::TableShape { table: "buckets", .. })));
    }

    #[test]
    fn test_model_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SubwordModel>();
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ModelState::Trained.to_string(), "trained");
        assert_eq!(ModelState::VocabularyBuilt.to_string(), "vocabulary-built");
    }
}
