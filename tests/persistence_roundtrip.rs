//! Save/load tests against real files.

use std::fs;

use ngramvec::{
    Corpus, LookupError, ModelConfig, NativeTrainer, NgramVecError, PersistenceError,
    SubwordModel, TrainConfig,
};
use tempfile::tempdir;

const PROBES: &[&str] = &["night", "nights", "apple", "applesauce", "qqq", "the"];

fn trained() -> SubwordModel {
    let text = "the night was dark\nan apple a day\nthe long night\nan apple pie\n".repeat(8);
    let corpus = Corpus::from_text(&text);
    let config = ModelConfig::default()
        .with_dim(8)
        .with_bucket_count(5_000)
        .with_min_count(1);
    let mut model = SubwordModel::new(config).unwrap();
    model.build_vocabulary(&corpus).unwrap();
    let trainer = NativeTrainer::new(TrainConfig {
        epochs: 2,
        ..TrainConfig::default()
    })
    .unwrap();
    model.train(&trainer, &corpus).unwrap();
    model
}

fn bits(v: &[f32]) -> Vec<u32> {
    v.iter().map(|x| x.to_bits()).collect()
}

#[test]
fn test_full_roundtrip_preserves_every_lookup() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.ngv");
    let model = trained();
    model.save(&path).unwrap();

    let loaded = SubwordModel::load(&path).unwrap();
    assert_eq!(loaded.config(), model.config());
    assert_eq!(loaded.vocabulary(), model.vocabulary());
    for probe in PROBES {
        assert_eq!(
            bits(&loaded.vector_for(probe).unwrap()),
            bits(&model.vector_for(probe).unwrap()),
            "{probe}"
        );
        assert_eq!(loaded.in_vocabulary(probe), model.in_vocabulary(probe));
    }
}

#[test]
fn test_vocabulary_only_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reduced.ngv");
    let model = trained();
    model.save_vocabulary_only(&path).unwrap();

    let full = dir.path().join("full.ngv");
    model.save(&full).unwrap();
    assert!(fs::metadata(&path).unwrap().len() < fs::metadata(&full).unwrap().len());

    let loaded = SubwordModel::load(&path).unwrap();
    for word in ["night", "apple", "the"] {
        assert_eq!(
            bits(&loaded.vector_for(word).unwrap()),
            bits(&model.vector_for(word).unwrap())
        );
    }
    assert!(!loaded.has_vector("nights"));
    assert!(matches!(
        loaded.vector_for("nights"),
        Err(LookupError::NotFound { .. })
    ));
}

#[test]
fn test_truncated_file_fails_to_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.ngv");
    trained().save(&path).unwrap();

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() / 3]).unwrap();

    let err = SubwordModel::load(&path).unwrap_err();
    assert!(err.is_persistence());
    assert!(matches!(
        err,
        NgramVecError::Persistence(PersistenceError::Malformed { .. })
    ));
}

#[test]
fn test_flipped_byte_fails_to_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.ngv");
    trained().save(&path).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0x10;
    fs::write(&path, &bytes).unwrap();

    assert!(matches!(
        SubwordModel::load(&path),
        Err(NgramVecError::Persistence(PersistenceError::Malformed { .. }))
    ));
}

#[test]
fn test_not_a_model_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    fs::write(&path, b"just some words, not vectors").unwrap();
    assert!(matches!(
        SubwordModel::load(&path),
        Err(NgramVecError::Persistence(PersistenceError::Malformed { .. }))
    ));
}

#[test]
fn test_overwrite_replaces_file_and_leaves_no_temp() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.ngv");
    fs::write(&path, b"stale").unwrap();

    let model = trained();
    model.save(&path).unwrap();
    let loaded = SubwordModel::load(&path).unwrap();
    assert_eq!(loaded.vocabulary().len(), model.vocabulary().len());

    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_save_into_missing_directory_creates_it() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("model.ngv");
    trained().save(&path).unwrap();
    assert!(SubwordModel::load(&path).is_ok());
}
