//! Saving and loading models.
//!
//! # File layout
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ magic "NGVC" │ version                       │
//! ├──────────────────────────────────────────────┤
//! │ header frame (JSON): hyperparameters,        │
//! │   vocab_len, has_buckets, saved_at           │
//! ├──────────────────────────────────────────────┤
//! │ vocabulary frame (JSON): [(word, count)...]  │
//! ├──────────────────────────────────────────────┤
//! │ word table (f32 LE): vocab_len × dim         │
//! ├──────────────────────────────────────────────┤
//! │ bucket table (f32 LE): bucket_count × dim    │
//! │   (full layout only)                         │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Every frame carries a CRC32. Saves are atomic (temp file + rename).
//! Loads validate the whole file before a model is constructed.
//!
//! The vocabulary-only layout stores each word's composed vector in the
//! word table and omits the bucket table. A model loaded from it cannot
//! resolve out-of-vocabulary words; this loss is permanent.

mod codec;
mod writer;

pub use codec::{CODEC_VERSION, MAGIC};
pub use writer::ModelFileWriter;

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::error::{NgramVecResult, PersistenceError};
use crate::model::SubwordModel;
use crate::table::VectorTable;
use crate::vocab::Vocabulary;

/// Which tables a save writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Vocabulary and bucket tables, bit for bit.
    Full,
    /// Composed vocabulary vectors only; no subword fallback after load.
    VocabularyOnly,
}

/// Persisted header frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelHeader {
    /// Hyperparameters the tables were built with.
    pub config: ModelConfig,
    /// Rows in the word table.
    pub vocab_len: usize,
    /// Whether a bucket table follows the word table.
    pub has_buckets: bool,
    /// When the file was written.
    pub saved_at: DateTime<Utc>,
}

/// Saves `model` with both tables.
///
/// # Errors
/// `NotReady` if the model is not trained; I/O errors from writing.
pub fn save(model: &SubwordModel, path: impl AsRef<Path>) -> NgramVecResult<()> {
    save_with_layout(model, path.as_ref(), Layout::Full)
}

/// Saves `model` without its bucket table.
///
/// # Errors
/// `NotReady` if the model is not trained; I/O errors from writing.
pub fn save_vocabulary_only(model: &SubwordModel, path: impl AsRef<Path>) -> NgramVecResult<()> {
    save_with_layout(model, path.as_ref(), Layout::VocabularyOnly)
}

/// Saves `model` in the given layout.
///
/// # Errors
/// `NotReady` if the model is not trained; I/O errors from writing.
pub fn save_with_layout(model: &SubwordModel, path: &Path, layout: Layout) -> NgramVecResult<()> {
    model.ensure_trained()?;

    let (words, buckets) = match layout {
        Layout::Full => (Cow::Borrowed(model.word_vectors()), model.bucket_vectors()),
        Layout::VocabularyOnly => (Cow::Owned(composed_word_table(model)?), None),
    };
    let header = ModelHeader {
        config: model.config().clone(),
        vocab_len: model.vocabulary().len(),
        has_buckets: buckets.is_some(),
        saved_at: Utc::now(),
    };

    let mut file = ModelFileWriter::create(path).map_err(PersistenceError::from)?;
    write_model(
        file.writer().map_err(PersistenceError::from)?,
        &header,
        model.vocabulary(),
        &words,
        buckets,
    )
    .map_err(PersistenceError::from)?;
    file.finalize().map_err(PersistenceError::from)?;

    info!(
        path = %path.display(),
        ?layout,
        words = header.vocab_len,
        buckets = buckets.map_or(0, VectorTable::rows),
        "model saved"
    );
    Ok(())
}

fn composed_word_table(model: &SubwordModel) -> NgramVecResult<VectorTable> {
    let mut table = VectorTable::zeros(model.vocabulary().len(), model.dim());
    for (idx, entry) in model.vocabulary().iter().enumerate() {
        let v = model.vector_for(&entry.word)?;
        table.row_mut(idx).copy_from_slice(&v);
    }
    Ok(table)
}

fn write_model(
    w: &mut impl Write,
    header: &ModelHeader,
    vocab: &Vocabulary,
    words: &VectorTable,
    buckets: Option<&VectorTable>,
) -> std::io::Result<()> {
    codec::write_header(w)?;
    codec::write_meta(w, header)?;
    codec::write_meta(w, vocab)?;
    codec::write_floats(w, words.as_flat())?;
    if let Some(b) = buckets {
        codec::write_floats(w, b.as_flat())?;
    }
    Ok(())
}

/// Loads a model saved by [`save`] or [`save_vocabulary_only`].
///
/// Nothing is returned unless every frame decodes, every checksum matches
/// and every table has the shape the header promises.
///
/// # Errors
/// `Malformed` for any structural problem; `Io` for other I/O failures.
pub fn load(path: impl AsRef<Path>) -> NgramVecResult<SubwordModel> {
    let path = path.as_ref();
    let file = File::open(path).map_err(PersistenceError::from)?;
    let mut reader = BufReader::new(file);
    let model = read_model(&mut reader)?;

    info!(
        path = %path.display(),
        words = model.vocabulary().len(),
        subwords = model.subwords_enabled(),
        "model loaded"
    );
    Ok(model)
}

/// Reads a model from any reader. See [`load`].
///
/// # Errors
/// Same as [`load`].
pub fn read_model(reader: &mut impl Read) -> NgramVecResult<SubwordModel> {
    codec::read_header(reader).map_err(classify)?;
    let header: ModelHeader = codec::read_meta(reader).map_err(classify)?;
    debug!(?header, "model header read");

    let config = header
        .config
        .clone()
        .validate()
        .map_err(|e| PersistenceError::malformed(format!("invalid hyperparameters: {e}")))?;

    let vocab: Vocabulary = codec::read_meta(reader).map_err(classify)?;
    if vocab.len() != header.vocab_len {
        return Err(PersistenceError::malformed(format!(
            "header promises {} words, vocabulary frame has {}",
            header.vocab_len,
            vocab.len()
        ))
        .into());
    }

    let word_len = table_len(header.vocab_len, config.dim)?;
    let words = codec::read_floats(reader, word_len).map_err(classify)?;
    let words = VectorTable::from_flat(header.vocab_len, config.dim, words)
        .map_err(|e| PersistenceError::malformed(e.to_string()))?;

    let buckets = if header.has_buckets {
        let bucket_len = table_len(config.bucket_count, config.dim)?;
        let data = codec::read_floats(reader, bucket_len).map_err(classify)?;
        Some(
            VectorTable::from_flat(config.bucket_count, config.dim, data)
                .map_err(|e| PersistenceError::malformed(e.to_string()))?,
        )
    } else {
        None
    };

    let mut trailing = [0u8; 1];
    match reader.read(&mut trailing) {
        Ok(0) => {}
        Ok(_) => return Err(PersistenceError::malformed("trailing bytes after last frame").into()),
        Err(e) => return Err(classify(e).into()),
    }

    SubwordModel::from_parts(config, vocab, words, buckets)
        .map_err(|e| PersistenceError::malformed(e.to_string()).into())
}

impl SubwordModel {
    /// Shorthand for [`save`].
    ///
    /// # Errors
    /// Same as [`save`].
    pub fn save(&self, path: impl AsRef<Path>) -> NgramVecResult<()> {
        save(self, path)
    }

    /// Shorthand for [`save_vocabulary_only`].
    ///
    /// # Errors
    /// Same as [`save_vocabulary_only`].
    pub fn save_vocabulary_only(&self, path: impl AsRef<Path>) -> NgramVecResult<()> {
        save_vocabulary_only(self, path)
    }

    /// Shorthand for [`load`].
    ///
    /// # Errors
    /// Same as [`load`].
    pub fn load(path: impl AsRef<Path>) -> NgramVecResult<Self> {
        load(path)
    }
}

fn table_len(rows: usize, dim: usize) -> Result<usize, PersistenceError> {
    rows.checked_mul(dim)
        .ok_or_else(|| PersistenceError::malformed(format!("table of {rows} × {dim} overflows")))
}

/// Format problems become `Malformed`; anything else stays an I/O error.
fn classify(e: std::io::Error) -> PersistenceError {
    match e.kind() {
        ErrorKind::InvalidData => PersistenceError::malformed(e.to_string()),
        ErrorKind::UnexpectedEof => PersistenceError::malformed("file is truncated"),
        _ => PersistenceError::Io(e),
    }
}
