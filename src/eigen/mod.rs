//! Eigenpair extraction: power iteration and variance-driven deflation.
//!
//! - [`power`]: `PowerIterator`, the dominant (eigenvalue, eigenvector) pair of a square operator.
//! - [`deflation`]: `SpectralExtractor`, repeated power iteration with rank-one deflation until a
//!   fraction of the trace has been captured.
//!
//! Only matrix–vector products are used; no dense eigen-decomposition is performed.

use crate::utils::convergence::IterStats;
use num_traits::Float;

/// An eigenvalue with its unit-length eigenvector.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenPair<T> {
    pub value: T,
    pub vector: Vec<T>,
}

/// Common interface for dominant-eigenpair solvers.
pub trait EigenSolver<M> {
    type Scalar;
    type Error;
    /// Find the eigenpair of largest magnitude of `a`.
    /// Returns the pair together with iteration stats.
    fn dominant(
        &mut self,
        a: &M,
    ) -> Result<(EigenPair<Self::Scalar>, IterStats<Self::Scalar>), Self::Error>;
}

pub mod power;
pub use power::PowerIterator;

pub mod deflation;
pub use deflation::{extract, project, Extraction, ExtractionStatus, SpectralExtractor};

pub(crate) fn as_f64<T: Float>(v: T) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}
