//! Trainer that delegates to an external executable.
//!
//! The corpus is written to a temporary file, the configured program is
//! run with placeholder-substituted arguments, and its stdout is parsed as
//! a text vector dump:
//!
//! ```text
//! <words> <buckets> <dim>
//! <word> <f1> ... <fD>        (repeated <words> times)
//! <f1> ... <fD>               (repeated <buckets> times, in bucket order)
//! ```
//!
//! Recognized placeholders: `{input}`, `{dim}`, `{minn}`, `{maxn}`,
//! `{bucket}`, `{epoch}`, `{mincount}`.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::TrainingError;
use crate::table::VectorTable;

use super::{TrainReport, Trainer, TrainingInput};

/// How to invoke the external trainer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTrainerConfig {
    /// Executable to run.
    pub program: PathBuf,
    /// Arguments, with placeholders substituted per run.
    pub args: Vec<String>,
    /// Epoch count passed through `{epoch}`.
    pub epochs: usize,
    /// Directory for the temporary corpus file. Defaults to the system temp dir.
    pub work_dir: Option<PathBuf>,
}

impl ExternalTrainerConfig {
    /// Creates a config for `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            epochs: 5,
            work_dir: None,
        }
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets the epoch count.
    #[must_use]
    pub fn epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Sets the directory for the temporary corpus file.
    #[must_use]
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }
}

/// Runs an external program and captures the vectors it prints.
#[derive(Debug, Clone)]
pub struct ExternalProcessTrainer {
    config: ExternalTrainerConfig,
}

impl ExternalProcessTrainer {
    /// Creates a trainer that runs `config.program`.
    #[must_use]
    pub fn new(config: ExternalTrainerConfig) -> Self {
        Self { config }
    }

    fn render_args(&self, input_path: &Path, input: &TrainingInput<'_>) -> Vec<String> {
        let cfg = input.config;
        let input_str = input_path.to_string_lossy();
        self.config
            .args
            .iter()
            .map(|a| {
                a.replace("{input}", &input_str)
                    .replace("{dim}", &cfg.dim.to_string())
                    .replace("{minn}", &cfg.min_n.to_string())
                    .replace("{maxn}", &cfg.max_n.to_string())
                    .replace("{bucket}", &cfg.bucket_count.to_string())
                    .replace("{epoch}", &self.config.epochs.to_string())
                    .replace("{mincount}", &cfg.min_count.to_string())
            })
            .collect()
    }
}

/// Temporary corpus file, removed on drop.
struct CorpusFile {
    path: PathBuf,
}

impl CorpusFile {
    fn write(dir: &Path, input: &TrainingInput<'_>) -> Result<Self, TrainingError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("ngramvec-corpus-{}.txt", Uuid::new_v4()));
        let file = CorpusFile { path };
        let mut writer = BufWriter::new(File::create(&file.path)?);
        input.corpus.write_to(&mut writer)?;
        writer.flush()?;
        Ok(file)
    }
}

impl Drop for CorpusFile {
    fn drop(&mut self) {
        if self.path.exists() {
            let _ = fs::remove_file(&self.path);
        }
    }
}

impl Trainer for ExternalProcessTrainer {
    fn name(&self) -> &'static str {
        "external-process"
    }

    fn train(
        &self,
        input: &TrainingInput<'_>,
        words: &mut VectorTable,
        buckets: &mut VectorTable,
    ) -> Result<TrainReport, TrainingError> {
        let dir = self
            .config
            .work_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let corpus_file = CorpusFile::write(&dir, input)?;
        let args = self.render_args(&corpus_file.path, input);

        info!(program = %self.config.program.display(), ?args, "spawning external trainer");
        let output = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| TrainingError::Process {
                message: format!("failed to spawn {}: {e}", self.config.program.display()),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            warn!(status = %output.status, "external trainer failed");
            return Err(TrainingError::Process {
                message: format!("exited with {}: {}", output.status, stderr.trim()),
            });
        }
        if !stderr.trim().is_empty() {
            debug!(stderr = %stderr.trim(), "external trainer stderr");
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| TrainingError::Output {
            line: 0,
            message: "output is not valid UTF-8".to_string(),
        })?;
        parse_dump(&stdout, input, words, buckets)?;

        Ok(TrainReport {
            epochs: self.config.epochs,
            tokens_processed: 0,
            final_loss: f32::NAN,
        })
    }
}

/// Parses a vector dump into the arenas. Every vocabulary word must appear
/// exactly once; the bucket section must cover the whole bucket table.
fn parse_dump(
    text: &str,
    input: &TrainingInput<'_>,
    words: &mut VectorTable,
    buckets: &mut VectorTable,
) -> Result<(), TrainingError> {
    let dim = input.config.dim;
    let vocab = input.vocabulary;
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));

    let (_, header) = lines.next().ok_or(TrainingError::Output {
        line: 1,
        message: "empty output".to_string(),
    })?;
    let header: Vec<usize> = header
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|e| TrainingError::Output {
            line: 1,
            message: format!("bad header: {e}"),
        })?;
    let &[n_words, n_buckets, out_dim] = header.as_slice() else {
        return Err(TrainingError::Output {
            line: 1,
            message: "header must be '<words> <buckets> <dim>'".to_string(),
        });
    };
    if out_dim != dim {
        return Err(TrainingError::Output {
            line: 1,
            message: format!("dimension {out_dim} does not match model dimension {dim}"),
        });
    }
    if n_words != vocab.len() {
        return Err(TrainingError::Output {
            line: 1,
            message: format!("{n_words} words, vocabulary has {}", vocab.len()),
        });
    }
    if n_buckets != buckets.rows() {
        return Err(TrainingError::Output {
            line: 1,
            message: format!("{n_buckets} buckets, model has {}", buckets.rows()),
        });
    }

    let mut filled = vec![false; vocab.len()];
    for _ in 0..n_words {
        let (line_no, line) = lines.next().ok_or(TrainingError::Output {
            line: 0,
            message: "truncated word section".to_string(),
        })?;
        let mut fields = line.split_whitespace();
        let word = fields.next().ok_or(TrainingError::Output {
            line: line_no,
            message: "missing word".to_string(),
        })?;
        let idx = vocab.get(word).ok_or_else(|| TrainingError::VocabularyMismatch {
            word: word.to_string(),
        })?;
        if std::mem::replace(&mut filled[idx], true) {
            return Err(TrainingError::Output {
                line: line_no,
                message: format!("word '{word}' appears twice"),
            });
        }
        parse_floats(fields, words.row_mut(idx), line_no)?;
    }

    for bucket in 0..n_buckets {
        let (line_no, line) = lines.next().ok_or(TrainingError::Output {
            line: 0,
            message: "truncated bucket section".to_string(),
        })?;
        parse_floats(line.split_whitespace(), buckets.row_mut(bucket), line_no)?;
    }
    Ok(())
}

fn parse_floats<'a>(
    fields: impl Iterator<Item = &'a str>,
    row: &mut [f32],
    line: usize,
) -> Result<(), TrainingError> {
    let len = row.len();
    let mut n = 0;
    for field in fields {
        let slot = row.get_mut(n).ok_or_else(|| TrainingError::Output {
            line,
            message: format!("more than {len} components"),
        })?;
        *slot = field.parse().map_err(|e| TrainingError::Output {
            line,
            message: format!("bad float '{field}': {e}"),
        })?;
        n += 1;
    }
    if n != len {
        return Err(TrainingError::Output {
            line,
            message: format!("{n} components, expected {len}"),
        });
    }
    Ok(())
}
