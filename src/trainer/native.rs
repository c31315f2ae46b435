//! In-process skip-gram trainer with negative sampling.
//!
//! Each center word is represented by the sum of its word vector and the
//! bucket vectors of its distinct n-grams (the same composition lookups
//! use). That hidden vector predicts each context word against
//! `negatives` noise words drawn from the unigram distribution raised to
//! the 3/4 power. Gradients are spread evenly over the rows that formed
//! the hidden vector. Single-threaded and fully determined by the seed.

use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::config::TrainConfig;
use crate::error::{ConfigError, TrainingError};
use crate::model::subword_buckets;
use crate::table::VectorTable;

use super::{TrainReport, Trainer, TrainingInput};

/// Floor for the decayed learning rate, as a fraction of the initial one.
const MIN_LR_FRACTION: f32 = 1e-4;

/// Skip-gram with negative sampling over subword-composed inputs.
#[derive(Debug, Clone)]
pub struct NativeTrainer {
    config: TrainConfig,
}

impl NativeTrainer {
    /// Creates a trainer after validating `config`.
    ///
    /// # Errors
    /// Returns `ConfigError` if `config` does not validate.
    pub fn new(config: TrainConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            config: config.validate()?,
        })
    }

    /// Validated training hyperparameters.
    #[must_use]
    pub fn config(&self) -> &TrainConfig {
        &self.config
    }
}

impl Default for NativeTrainer {
    fn default() -> Self {
        Self {
            config: TrainConfig::default(),
        }
    }
}

/// Per-step scratch buffers, reused across the whole run.
struct Scratch {
    hidden: Vec<f32>,
    grad: Vec<f32>,
}

impl Trainer for NativeTrainer {
    fn name(&self) -> &'static str {
        "native"
    }

    fn train(
        &self,
        input: &TrainingInput<'_>,
        words: &mut VectorTable,
        buckets: &mut VectorTable,
    ) -> Result<TrainReport, TrainingError> {
        let vocab = input.vocabulary;
        let dim = input.config.dim;
        let cfg = &self.config;

        // Corpus as vocabulary indices; OOV tokens are dropped.
        let sentences: Vec<Vec<usize>> = input
            .corpus
            .sentences()
            .iter()
            .map(|s| s.iter().filter_map(|t| vocab.get(t)).collect::<Vec<_>>())
            .filter(|s| s.len() > 1)
            .collect();
        let tokens_per_epoch: u64 = sentences.iter().map(|s| s.len() as u64).sum();
        if tokens_per_epoch == 0 {
            return Err(TrainingError::EmptyCorpus);
        }

        let subwords: Vec<Vec<usize>> = vocab
            .iter()
            .map(|e| subword_buckets(&e.word, input.config))
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let weights: Vec<f64> = vocab.iter().map(|e| (e.count as f64).powf(0.75)).collect();
        let noise = WeightedIndex::new(&weights).map_err(|e| TrainingError::Process {
            message: format!("invalid noise distribution: {e}"),
        })?;

        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        let mut output = VectorTable::zeros(vocab.len(), dim);
        let mut scratch = Scratch {
            hidden: vec![0.0; dim],
            grad: vec![0.0; dim],
        };

        let total = tokens_per_epoch * cfg.epochs as u64;
        let mut processed = 0u64;
        let mut epoch_loss = 0.0f64;
        let mut epoch_pairs = 0u64;

        for epoch in 0..cfg.epochs {
            epoch_loss = 0.0;
            epoch_pairs = 0;
            for sentence in &sentences {
                for (pos, &center) in sentence.iter().enumerate() {
                    #[allow(clippy::cast_precision_loss)]
                    let progress = processed as f32 / total as f32;
                    let lr = cfg.learning_rate * (1.0 - progress).max(MIN_LR_FRACTION);
                    processed += 1;

                    let span = rng.gen_range(1..=cfg.window);
                    let lo = pos.saturating_sub(span);
                    let hi = (pos + span).min(sentence.len() - 1);
                    for ctx_pos in lo..=hi {
                        if ctx_pos == pos {
                            continue;
                        }
                        let loss = train_pair(
                            center,
                            sentence[ctx_pos],
                            &subwords[center],
                            lr,
                            cfg.negatives,
                            &noise,
                            &mut rng,
                            words,
                            buckets,
                            &mut output,
                            &mut scratch,
                        );
                        epoch_loss += f64::from(loss);
                        epoch_pairs += 1;
                    }
                }
            }
            debug!(
                epoch,
                pairs = epoch_pairs,
                loss = mean(epoch_loss, epoch_pairs),
                "native trainer epoch done"
            );
        }

        #[allow(clippy::cast_possible_truncation)]
        let final_loss = mean(epoch_loss, epoch_pairs) as f32;
        Ok(TrainReport {
            epochs: cfg.epochs,
            tokens_processed: processed,
            final_loss,
        })
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(sum: f64, n: u64) -> f64 {
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// One positive update plus `negatives` noise updates. Returns the loss.
#[allow(clippy::too_many_arguments)]
fn train_pair(
    center: usize,
    target: usize,
    subwords: &[usize],
    lr: f32,
    negatives: usize,
    noise: &WeightedIndex<f64>,
    rng: &mut ChaCha8Rng,
    words: &mut VectorTable,
    buckets: &mut VectorTable,
    output: &mut VectorTable,
    scratch: &mut Scratch,
) -> f32 {
    scratch.hidden.copy_from_slice(words.row(center));
    for &b in subwords {
        buckets.add_row_into(b, &mut scratch.hidden);
    }
    scratch.grad.iter_mut().for_each(|g| *g = 0.0);

    let mut loss = binary_logistic(target, true, lr, output, scratch);
    for _ in 0..negatives {
        let neg = noise.sample(rng);
        if neg == target {
            continue;
        }
        loss += binary_logistic(neg, false, lr, output, scratch);
    }

    #[allow(clippy::cast_precision_loss)]
    let share = 1.0 / (1 + subwords.len()) as f32;
    words.axpy_row(center, share, &scratch.grad);
    for &b in subwords {
        buckets.axpy_row(b, share, &scratch.grad);
    }
    loss
}

fn binary_logistic(
    target: usize,
    label: bool,
    lr: f32,
    output: &mut VectorTable,
    scratch: &mut Scratch,
) -> f32 {
    let out = output.row(target);
    let dot: f32 = scratch.hidden.iter().zip(out).map(|(h, o)| h * o).sum();
    let score = sigmoid(dot);
    let expected = if label { 1.0 } else { 0.0 };
    let g = lr * (expected - score);
    for (gr, &o) in scratch.grad.iter_mut().zip(out) {
        *gr += g * o;
    }
    output.axpy_row(target, g, &scratch.hidden);
    if label {
        -score.max(1e-7).ln()
    } else {
        -(1.0 - score).max(1e-7).ln()
    }
}

fn sigmoid(x: f32) -> f32 {
    if x > 8.0 {
        1.0
    } else if x < -8.0 {
        0.0
    } else {
        1.0 / (1.0 + (-x).exp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::corpus::Corpus;
    use crate::vocab::Vocabulary;

    fn setup(text: &str) -> (Corpus, Vocabulary, ModelConfig) {
        let corpus = Corpus::from_text(text);
        let config = ModelConfig::default()
            .with_dim(10)
            .with_bucket_count(512)
            .with_min_count(1);
        let vocab = Vocabulary::scan(&corpus, 1);
        (corpus, vocab, config)
    }

    fn arenas(vocab: &Vocabulary, config: &ModelConfig) -> (VectorTable, VectorTable) {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        (
            VectorTable::uniform(vocab.len(), config.dim, &mut rng),
            VectorTable::uniform(config.bucket_count, config.dim, &mut rng),
        )
    }

    #[test]
    fn test_rejects_invalid_config() {
        let cfg = TrainConfig {
            window: 0,
            ..TrainConfig::default()
        };
        assert!(NativeTrainer::new(cfg).is_err());
    }

    #[test]
    fn test_training_is_deterministic() {
        let (corpus, vocab, config) = setup("the cat sat on the mat\nthe dog sat on the log");
        let input = TrainingInput {
            corpus: &corpus,
            vocabulary: &vocab,
            config: &config,
        };
        let trainer = NativeTrainer::default();

        let (mut w1, mut b1) = arenas(&vocab, &config);
        let r1 = trainer.train(&input, &mut w1, &mut b1).unwrap();
        let (mut w2, mut b2) = arenas(&vocab, &config);
        let r2 = trainer.train(&input, &mut w2, &mut b2).unwrap();

        assert_eq!(w1, w2);
        assert_eq!(b1, b2);
        assert_eq!(r1, r2);
        assert_eq!(r1.epochs, 5);
        assert_eq!(r1.tokens_processed, 60);
        assert!(r1.final_loss.is_finite());
    }

    #[test]
    fn test_training_moves_vectors() {
        let (corpus, vocab, config) = setup("a b c d\nb c d a\nc d a b");
        let input = TrainingInput {
            corpus: &corpus,
            vocabulary: &vocab,
            config: &config,
        };
        let (mut words, mut buckets) = arenas(&vocab, &config);
        let before = words.clone();
        NativeTrainer::default()
            .train(&input, &mut words, &mut buckets)
            .unwrap();
        assert_ne!(before, words);
        assert!(words.as_flat().iter().all(|x| x.is_finite()));
        assert!(buckets.as_flat().iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_no_trainable_pairs_is_empty_corpus() {
        let (corpus, vocab, config) = setup("alone\nsolo");
        let input = TrainingInput {
            corpus: &corpus,
            vocabulary: &vocab,
            config: &config,
        };
        let (mut words, mut buckets) = arenas(&vocab, &config);
        let err = NativeTrainer::default()
            .train(&input, &mut words, &mut buckets)
            .unwrap_err();
        assert!(matches!(err, TrainingError::EmptyCorpus));
    }

    #[test]
    fn test_loss_decreases_over_training() {
        let text = "red apple sweet fruit\ngreen apple sour fruit\nred cherry sweet fruit\n".repeat(20);
        let (corpus, vocab, config) = setup(&text);
        let input = TrainingInput {
            corpus: &corpus,
            vocabulary: &vocab,
            config: &config,
        };

        let short = NativeTrainer::new(TrainConfig {
            epochs: 1,
            ..TrainConfig::default()
        })
        .unwrap();
        let long = NativeTrainer::new(TrainConfig {
            epochs: 20,
            ..TrainConfig::default()
        })
        .unwrap();

        let (mut w, mut b) = arenas(&vocab, &config);
        let first = short.train(&input, &mut w, &mut b).unwrap().final_loss;
        let (mut w, mut b) = arenas(&vocab, &config);
        let last = long.train(&input, &mut w, &mut b).unwrap().final_loss;
        assert!(last < first, "loss should drop: {first} -> {last}");
    }
}
