use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use ngramvec::{extract_ngrams, ModelConfig, SubwordModel, VectorTable, Vocabulary};

const VOCAB: usize = 10_000;
const DIM: usize = 100;
const BUCKETS: usize = 200_000;

/// A trained-shaped model with random tables; lookups cost the same
/// whatever the values are.
fn make_model() -> SubwordModel {
    let config = ModelConfig::default()
        .with_dim(DIM)
        .with_bucket_count(BUCKETS)
        .with_min_count(1);
    let vocab = Vocabulary::from_counts(
        (0..VOCAB).map(|i| (format!("word{i}"), 1_000_000 - i as u64)),
        1,
    );
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let words = VectorTable::uniform(VOCAB, DIM, &mut rng);
    let buckets = VectorTable::uniform(BUCKETS, DIM, &mut rng);
    SubwordModel::from_parts(config, vocab, words, Some(buckets)).expect("valid model")
}

fn bench_ngrams(c: &mut Criterion) {
    c.bench_function("ngram/extract_12_chars", |b| {
        b.iter(|| extract_ngrams(black_box("internationa"), 3, 6));
    });
}

fn bench_vector_for(c: &mut Criterion) {
    let model = make_model();

    let mut group = c.benchmark_group("vector_for");
    group.throughput(Throughput::Elements(1));
    group.bench_function("in_vocabulary", |b| {
        b.iter(|| model.vector_for(black_box("word42")).expect("lookup"));
    });
    group.bench_function("out_of_vocabulary", |b| {
        b.iter(|| model.vector_for(black_box("unseenword")).expect("lookup"));
    });
    group.finish();
}

fn bench_most_similar(c: &mut Criterion) {
    let model = make_model();
    // First query builds the normalized cache; keep that out of the samples.
    model.most_similar(&["word1"], &[], 1).expect("warm cache");

    let mut group = c.benchmark_group("most_similar");
    group.throughput(Throughput::Elements(VOCAB as u64));
    group.bench_function("top10_over_10k", |b| {
        b.iter(|| model.most_similar(black_box(&["word1"]), &[], 10).expect("query"));
    });
    group.finish();
}

criterion_group!(lookup, bench_ngrams, bench_vector_for, bench_most_similar);
criterion_main!(lookup);
