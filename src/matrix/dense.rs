//! Dense‐matrix API on top of Faer.
//!
//! This module provides the `DenseMatrix` trait and its implementation for the `faer::Mat<T>` type:
//! construction from rows, the trace, and the rank-one update used to deflate a
//! covariance matrix once an eigenpair has been found.

use crate::core::traits::{MatShape, MatVec};
use faer::Mat;
use num_traits::Float;

/// Dense square/rectangular matrix helpers the extraction engine relies on.
pub trait DenseMatrix<T>: MatVec<Vec<T>> + MatShape {
    /// Construct from a slice of equally sized rows.
    fn from_rows(rows: &[Vec<T>]) -> Self;
    /// Whether the matrix has as many rows as columns.
    fn is_square(&self) -> bool {
        MatShape::nrows(self) == MatShape::ncols(self)
    }
    /// Sum of the main diagonal.
    fn trace(&self) -> T;
    /// Whether every entry is finite.
    fn all_finite(&self) -> bool;
    /// In-place rank-one update: A ← A − λ·v·vᵀ.
    fn rank_one_update(&mut self, lambda: T, v: &[T]);
}

impl<T: Float + Send + Sync> DenseMatrix<T> for Mat<T> {
    fn from_rows(rows: &[Vec<T>]) -> Self {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, Vec::len);
        assert!(
            rows.iter().all(|r| r.len() == ncols),
            "All rows must have the same length"
        );
        Mat::from_fn(nrows, ncols, |i, j| rows[i][j])
    }

    fn trace(&self) -> T {
        let n = self.nrows().min(self.ncols());
        (0..n).fold(T::zero(), |acc, i| acc + self[(i, i)])
    }

    fn all_finite(&self) -> bool {
        (0..self.ncols()).all(|j| (0..self.nrows()).all(|i| self[(i, j)].is_finite()))
    }

    fn rank_one_update(&mut self, lambda: T, v: &[T]) {
        assert_eq!(self.nrows(), v.len(), "Update vector has incorrect length");
        assert_eq!(self.ncols(), v.len(), "Update vector has incorrect length");
        for j in 0..v.len() {
            let scaled = lambda * v[j];
            for i in 0..v.len() {
                self[(i, j)] = self[(i, j)] - scaled * v[i];
            }
        }
    }
}
