//! Fixed-shape vector arena.
//!
//! A `VectorTable` is `rows × dim` floats in one contiguous buffer. The
//! shape is set at construction and never changes; slots are addressed by
//! integer row index.

use rand::Rng;

use crate::error::LookupError;

/// Contiguous arena of equally sized vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorTable {
    dim: usize,
    rows: usize,
    data: Vec<f32>,
}

impl VectorTable {
    /// Creates a zero-filled table.
    #[must_use]
    pub fn zeros(rows: usize, dim: usize) -> Self {
        Self {
            dim,
            rows,
            data: vec![0.0; rows * dim],
        }
    }

    /// Creates a table with entries drawn uniformly from `[-1/dim, 1/dim)`.
    pub fn uniform(rows: usize, dim: usize, rng: &mut impl Rng) -> Self {
        let mut table = Self::zeros(rows, dim);
        if dim > 0 {
            #[allow(clippy::cast_precision_loss)]
            let bound = 1.0 / dim as f32;
            for x in &mut table.data {
                *x = rng.gen_range(-bound..bound);
            }
        }
        table
    }

    /// Wraps an existing flat buffer.
    ///
    /// # Errors
    /// Returns `DimensionMismatch` if `data.len() != rows * dim`.
    pub fn from_flat(rows: usize, dim: usize, data: Vec<f32>) -> Result<Self, LookupError> {
        if data.len() != rows * dim {
            return Err(LookupError::DimensionMismatch {
                expected: rows * dim,
                actual: data.len(),
            });
        }
        Ok(Self { dim, rows, data })
    }

    /// Builds a table from per-row vectors, each of which must be `dim` long.
    ///
    /// # Errors
    /// Returns `DimensionMismatch` for the first row of the wrong length.
    pub fn from_rows(dim: usize, rows: &[Vec<f32>]) -> Result<Self, LookupError> {
        let mut data = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            if row.len() != dim {
                return Err(LookupError::DimensionMismatch {
                    expected: dim,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            dim,
            rows: rows.len(),
            data,
        })
    }

    /// Components per row.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Row `idx`.
    ///
    /// # Panics
    /// Panics if `idx >= rows`.
    #[must_use]
    pub fn row(&self, idx: usize) -> &[f32] {
        let start = idx * self.dim;
        &self.data[start..start + self.dim]
    }

    /// Mutable row `idx`.
    ///
    /// # Panics
    /// Panics if `idx >= rows`.
    pub fn row_mut(&mut self, idx: usize) -> &mut [f32] {
        let start = idx * self.dim;
        &mut self.data[start..start + self.dim]
    }

    /// Adds row `idx` into `acc`.
    pub fn add_row_into(&self, idx: usize, acc: &mut [f32]) {
        for (a, &x) in acc.iter_mut().zip(self.row(idx)) {
            *a += x;
        }
    }

    /// Adds `scale * delta` to row `idx`.
    pub fn axpy_row(&mut self, idx: usize, scale: f32, delta: &[f32]) {
        for (x, &d) in self.row_mut(idx).iter_mut().zip(delta) {
            *x += scale * d;
        }
    }

    /// The flat buffer, row-major.
    #[must_use]
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    /// Rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact panics on 0; a zero-dim table has no data anyway.
        self.data.chunks_exact(self.dim.max(1)).take(self.rows)
    }
}
