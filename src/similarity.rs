//! Similarity queries over the composed vector space.
//!
//! Every query goes through `vector_for`, so out-of-vocabulary words can be
//! used as query terms. Candidates are always vocabulary words.

use std::collections::HashSet;

use crate::error::LookupError;
use crate::model::{normalize, SubwordModel};

/// Cosine similarity of two equally long vectors.
///
/// Returns 0.0 if either vector has zero norm.
///
/// # Errors
/// Returns `DimensionMismatch` if the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, LookupError> {
    if a.len() != b.len() {
        return Err(LookupError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let xf = f64::from(x);
        let yf = f64::from(y);
        dot += xf * yf;
        norm_a += xf * xf;
        norm_b += yf * yf;
    }

    if norm_a <= 0.0 || norm_b <= 0.0 {
        return Ok(0.0);
    }

    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    if sim.is_finite() {
        #[allow(clippy::cast_possible_truncation)]
        Ok(sim as f32)
    } else {
        Ok(0.0)
    }
}

/// A vocabulary word and its similarity to a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// The vocabulary word.
    pub word: String,
    /// Cosine similarity to the query, in `[-1, 1]`.
    pub similarity: f32,
}

impl SubwordModel {
    /// Cosine similarity between the vectors of two tokens.
    ///
    /// # Errors
    /// Any lookup error for either token.
    pub fn similarity(&self, a: &str, b: &str) -> Result<f32, LookupError> {
        cosine_similarity(&self.vector_for(a)?, &self.vector_for(b)?)
    }

    /// Vocabulary words closest to the mean of the unit-normalized
    /// `positive` vectors minus the `negative` ones. Query words are
    /// excluded from the result.
    ///
    /// # Errors
    /// - `EmptyQuery` if both lists are empty
    /// - any lookup error for a query word
    pub fn most_similar(
        &self,
        positive: &[&str],
        negative: &[&str],
        topn: usize,
    ) -> Result<Vec<Neighbor>, LookupError> {
        if positive.is_empty() && negative.is_empty() {
            return Err(LookupError::EmptyQuery);
        }

        let mut query = vec![0.0f32; self.dim()];
        for (words, sign) in [(positive, 1.0f32), (negative, -1.0f32)] {
            for w in words {
                let mut v = self.vector_for(w)?;
                normalize(&mut v);
                for (q, x) in query.iter_mut().zip(&v) {
                    *q += sign * x;
                }
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let n = (positive.len() + negative.len()) as f32;
        query.iter_mut().for_each(|q| *q /= n);

        let exclude: HashSet<&str> = positive.iter().chain(negative).copied().collect();
        self.nearest(&query, &exclude, topn)
    }

    /// Vocabulary words closest to an arbitrary vector.
    ///
    /// # Errors
    /// `DimensionMismatch` if `vector` is not `dim` long, or `NotReady`.
    pub fn most_similar_to_vector(
        &self,
        vector: &[f32],
        topn: usize,
    ) -> Result<Vec<Neighbor>, LookupError> {
        if vector.len() != self.dim() {
            return Err(LookupError::DimensionMismatch {
                expected: self.dim(),
                actual: vector.len(),
            });
        }
        self.nearest(vector, &HashSet::new(), topn)
    }

    /// Solves "`a` is to `b` as `c` is to ?".
    ///
    /// # Errors
    /// Any lookup error for `a`, `b` or `c`.
    pub fn analogy(&self, a: &str, b: &str, c: &str, topn: usize) -> Result<Vec<Neighbor>, LookupError> {
        self.most_similar(&[b, c], &[a], topn)
    }

    /// The word least similar to the mean of `words`.
    ///
    /// # Errors
    /// `EmptyQuery` for an empty list, or any lookup error.
    pub fn doesnt_match<'w>(&self, words: &[&'w str]) -> Result<&'w str, LookupError> {
        let mut vectors = Vec::with_capacity(words.len());
        for w in words {
            let mut v = self.vector_for(w)?;
            normalize(&mut v);
            vectors.push(v);
        }
        let mut mean = vec![0.0f32; self.dim()];
        for v in &vectors {
            for (m, x) in mean.iter_mut().zip(v) {
                *m += x;
            }
        }

        let mut worst: Option<(&'w str, f32)> = None;
        for (w, v) in words.iter().zip(&vectors) {
            let sim = cosine_similarity(&mean, v)?;
            if worst.map_or(true, |(_, s)| sim < s) {
                worst = Some((*w, sim));
            }
        }
        worst.map(|(w, _)| w).ok_or(LookupError::EmptyQuery)
    }

    /// Vocabulary words strictly closer to `a` than `b` is.
    ///
    /// # Errors
    /// Any lookup error for `a` or `b`.
    pub fn words_closer_than(&self, a: &str, b: &str) -> Result<Vec<String>, LookupError> {
        let query = self.vector_for(a)?;
        let mut unit_a = query.clone();
        normalize(&mut unit_a);
        let mut unit_b = self.vector_for(b)?;
        normalize(&mut unit_b);
        // Same arithmetic as `nearest`, so `b` itself never passes.
        let threshold: f32 = unit_a.iter().zip(&unit_b).map(|(x, y)| x * y).sum();
        let exclude: HashSet<&str> = [a].into_iter().collect();
        Ok(self
            .nearest(&query, &exclude, usize::MAX)?
            .into_iter()
            .take_while(|n| n.similarity > threshold)
            .map(|n| n.word)
            .collect())
    }

    /// Ranks vocabulary words by cosine to `query`; ties keep vocabulary order.
    fn nearest(
        &self,
        query: &[f32],
        exclude: &HashSet<&str>,
        topn: usize,
    ) -> Result<Vec<Neighbor>, LookupError> {
        let units = self.unit_vectors()?;
        let mut q = query.to_vec();
        normalize(&mut q);

        let mut scored: Vec<(usize, f32)> = Vec::with_capacity(units.rows());
        for (idx, row) in units.iter_rows().enumerate() {
            let entry_word = self.vocabulary().word(idx).unwrap_or_default();
            if exclude.contains(entry_word) {
                continue;
            }
            let dot: f32 = q.iter().zip(row).map(|(a, b)| a * b).sum();
            scored.push((idx, dot));
        }

        // Stable sort, so equal scores stay in vocabulary order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(topn);
        Ok(scored
            .into_iter()
            .map(|(idx, similarity)| Neighbor {
                word: self.vocabulary().word(idx).unwrap_or_default().to_string(),
                similarity,
            })
            .collect())
    }
}
