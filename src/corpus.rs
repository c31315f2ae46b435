//! Whitespace-tokenized training corpus.
//!
//! One sentence per line, tokens separated by whitespace. Anything more
//! elaborate is the caller's job; this is only what the vocabulary scan
//! and the trainers need.

use std::io::{BufRead, Result as IoResult, Write};

/// An in-memory corpus of tokenized sentences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    sentences: Vec<Vec<String>>,
}

impl Corpus {
    /// Creates an empty corpus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a corpus from text, one sentence per line. Blank lines are skipped.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let sentences = text
            .lines()
            .map(tokenize)
            .filter(|s| !s.is_empty())
            .collect();
        Self { sentences }
    }

    /// Reads a corpus line by line.
    ///
    /// # Errors
    /// Returns any I/O error from the reader.
    pub fn from_reader(reader: impl BufRead) -> IoResult<Self> {
        let mut sentences = Vec::new();
        for line in reader.lines() {
            let tokens = tokenize(&line?);
            if !tokens.is_empty() {
                sentences.push(tokens);
            }
        }
        Ok(Self { sentences })
    }

    /// Appends an already tokenized sentence.
    pub fn push_sentence<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sentence: Vec<String> = tokens.into_iter().map(Into::into).collect();
        if !sentence.is_empty() {
            self.sentences.push(sentence);
        }
    }

    /// All sentences in order.
    #[must_use]
    pub fn sentences(&self) -> &[Vec<String>] {
        &self.sentences
    }

    /// Every token in corpus order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.sentences.iter().flatten().map(String::as_str)
    }

    /// Total token count.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.sentences.iter().map(Vec::len).sum()
    }

    /// True if there are no sentences.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Writes the corpus back out, one space-joined sentence per line.
    ///
    /// # Errors
    /// Returns any I/O error from the writer.
    pub fn write_to(&self, writer: &mut impl Write) -> IoResult<()> {
        for sentence in &self.sentences {
            writeln!(writer, "{}", sentence.join(" "))?;
        }
        Ok(())
    }
}

fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}
