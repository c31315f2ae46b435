//! Character n-gram extraction.
//!
//! A word is wrapped in boundary markers (`<word>` by default) and sliced
//! into every contiguous run of `min_n..=max_n` characters, so that
//! prefixes and suffixes are distinguishable from word-internal n-grams.

use crate::config::{DEFAULT_BOW, DEFAULT_EOW};

/// Extracts the n-grams of `word` using the default `<` / `>` markers.
#[must_use]
pub fn extract_ngrams(word: &str, min_n: usize, max_n: usize) -> Vec<String> {
    extract_ngrams_with_markers(word, min_n, max_n, DEFAULT_BOW, DEFAULT_EOW)
}

/// Extracts the n-grams of `word` wrapped in `bow` / `eow`.
///
/// Output is ordered by start position, then by length. Duplicates are
/// kept. Returns an empty vector when `max_n == 0` or `max_n < min_n`.
/// A `min_n` of zero is treated as one. A 1-gram made of a lone boundary
/// marker is skipped.
#[must_use]
pub fn extract_ngrams_with_markers(
    word: &str,
    min_n: usize,
    max_n: usize,
    bow: char,
    eow: char,
) -> Vec<String> {
    let min_n = min_n.max(1);
    if max_n == 0 || max_n < min_n {
        return Vec::new();
    }

    let chars: Vec<char> = std::iter::once(bow)
        .chain(word.chars())
        .chain(std::iter::once(eow))
        .collect();
    let len = chars.len();

    let mut out = Vec::new();
    for start in 0..len {
        let longest = max_n.min(len - start);
        for n in min_n..=longest {
            if n == 1 && (start == 0 || start == len - 1) {
                continue;
            }
            out.push(chars[start..start + n].iter().collect());
        }
    }
    out
}
