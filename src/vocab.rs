//! Vocabulary table.
//!
//! Words are stored in descending frequency order; equal counts keep the
//! order in which the words were first seen. A word's position is its
//! slot index in the word vector arena.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::corpus::Corpus;
use crate::error::ModelError;

/// A single vocabulary word and its corpus frequency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabEntry {
    /// The word as it appeared in the corpus.
    pub word: String,
    /// Occurrences in the scanned corpus.
    pub count: u64,
}

/// Ordered vocabulary with a word → index map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<VocabEntry>", into = "Vec<VocabEntry>")]
pub struct Vocabulary {
    entries: Vec<VocabEntry>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Builds a vocabulary from `(word, count)` pairs in first-seen order.
    ///
    /// Repeated words have their counts summed. Words below `min_count` are
    /// dropped.
    pub fn from_counts<I, S>(counts: I, min_count: u64) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut order: Vec<VocabEntry> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        for (word, count) in counts {
            let word = word.into();
            match seen.get(&word) {
                Some(&i) => order[i].count += count,
                None => {
                    seen.insert(word.clone(), order.len());
                    order.push(VocabEntry { word, count });
                }
            }
        }

        order.retain(|e| e.count >= min_count);
        // Stable: ties stay in first-seen order.
        order.sort_by(|a, b| b.count.cmp(&a.count));
        let index = order
            .iter()
            .enumerate()
            .map(|(i, e)| (e.word.clone(), i))
            .collect();
        Self {
            entries: order,
            index,
        }
    }

    /// Counts every token of `corpus` and builds the vocabulary.
    #[must_use]
    pub fn scan(corpus: &Corpus, min_count: u64) -> Self {
        Self::from_counts(corpus.tokens().map(|t| (t, 1)), min_count)
    }

    /// Index of `word`, if present.
    #[must_use]
    pub fn get(&self, word: &str) -> Option<usize> {
        self.index.get(word).copied()
    }

    /// True if `word` is an entry.
    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    /// Word at `idx`.
    #[must_use]
    pub fn word(&self, idx: usize) -> Option<&str> {
        self.entries.get(idx).map(|e| e.word.as_str())
    }

    /// Frequency of the word at `idx`.
    #[must_use]
    pub fn count(&self, idx: usize) -> Option<u64> {
        self.entries.get(idx).map(|e| e.count)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no word survived `min_count`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all word counts.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }

    /// Entries in stored order.
    pub fn iter(&self) -> impl Iterator<Item = &VocabEntry> {
        self.entries.iter()
    }
}

impl TryFrom<Vec<VocabEntry>> for Vocabulary {
    type Error = ModelError;

    /// Takes `entries` as already ordered. Every word must be unique.
    fn try_from(entries: Vec<VocabEntry>) -> Result<Self, Self::Error> {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, e) in entries.iter().enumerate() {
            if index.insert(e.word.clone(), i).is_some() {
                return Err(ModelError::DuplicateWord {
                    word: e.word.clone(),
                });
            }
        }
        Ok(Self { entries, index })
    }
}

impl From<Vocabulary> for Vec<VocabEntry> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_by_count_with_first_seen_ties() {
        let corpus = Corpus::from_text("b a c a b d\nc a");
        let vocab = Vocabulary::scan(&corpus, 1);
        let words: Vec<&str> = vocab.iter().map(|e| e.word.as_str()).collect();
        // a=3, b=2, c=2, d=1; b was seen before c.
        assert_eq!(words, vec!["a", "b", "c", "d"]);
        assert_eq!(vocab.get("c"), Some(2));
        assert_eq!(vocab.count(0), Some(3));
    }

    #[test]
    fn test_min_count_threshold() {
        let corpus = Corpus::from_text("x x x y y z");
        let vocab = Vocabulary::scan(&corpus, 2);
        assert_eq!(vocab.len(), 2);
        assert!(vocab.contains("x"));
        assert!(vocab.contains("y"));
        assert!(!vocab.contains("z"));
        assert_eq!(vocab.total_count(), 5);
    }

    #[test]
    fn test_from_counts_merges_duplicates() {
        let vocab = Vocabulary::from_counts([("a", 1), ("b", 1), ("a", 4)], 1);
        assert_eq!(vocab.word(0), Some("a"));
        assert_eq!(vocab.count(0), Some(5));
        assert_eq!(vocab.len(), 2);
    }

    #[test]
    fn test_serde_keeps_order_and_index() {
        let vocab = Vocabulary::from_counts([("night", 3), ("day", 3), ("sky", 1)], 1);
        let json = serde_json::to_string(&vocab).unwrap();
        let back: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vocab);
        assert_eq!(back.get("day"), Some(1));
    }

    #[test]
    fn test_repeated_word_is_rejected() {
        let entries = vec![
            VocabEntry {
                word: "night".to_string(),
                count: 2,
            },
            VocabEntry {
                word: "night".to_string(),
                count: 1,
            },
        ];
        let err = Vocabulary::try_from(entries).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateWord { ref word } if word == "night"));

        let json = r#"[{"word":"night","count":2},{"word":"night","count":1}]"#;
        assert!(serde_json::from_str::<Vocabulary>(json).is_err());
    }
}
