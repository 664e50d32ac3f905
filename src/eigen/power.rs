//! Power iteration for the dominant eigenpair.
//!
//! Starting from the all-ones vector, repeatedly applies `A`, estimates the eigenvalue with the
//! Rayleigh quotient `(w·x)/(x·x)` of the current candidate, and renormalizes `w = A·x`. Stops when
//! the step `‖w/‖w‖ − x‖₂` drops to the tolerance or the iteration cap is hit.
//!
//! Convergence is only guaranteed for symmetric matrices with a strictly dominant eigenvalue. A
//! dominant eigenvector exactly orthogonal to the all-ones start vector is never found.

use crate::config::{EigenvalueEstimate, ExtractOptions};
use crate::core::traits::{InnerProduct, MatShape, MatVec};
use crate::eigen::{as_f64, EigenPair, EigenSolver};
use crate::error::PcaError;
use crate::utils::convergence::{Convergence, IterStats};
use log::{trace, warn};
use num_traits::Float;

/// Power iteration solver, holding convergence parameters.
///
/// # Type Parameters
/// * `T` - Scalar type
#[derive(Debug, Clone)]
pub struct PowerIterator<T> {
    /// Convergence criteria (tolerance and max iterations)
    pub conv: Convergence<T>,
    /// Which vector the returned eigenvalue is measured on
    pub estimate: EigenvalueEstimate,
    /// Fail with `NotConverged` when the cap is reached
    pub strict: bool,
}

impl<T: Float + From<f64>> PowerIterator<T> {
    /// Create a new power iterator with given tolerance and maximum iterations.
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self {
            conv: Convergence { tol, max_iters },
            estimate: EigenvalueEstimate::Lagged,
            strict: false,
        }
    }

    pub fn from_options(opts: &ExtractOptions<T>) -> Self {
        Self {
            conv: Convergence { tol: opts.tol, max_iters: opts.max_iters },
            estimate: opts.estimate,
            strict: opts.strict,
        }
    }

    pub fn with_estimate(mut self, estimate: EigenvalueEstimate) -> Self {
        self.estimate = estimate;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), PcaError> {
        if !(self.conv.tol > T::zero()) {
            return Err(PcaError::invalid(format!(
                "tolerance must be positive, got {}",
                as_f64(self.conv.tol)
            )));
        }
        if self.conv.max_iters == 0 {
            return Err(PcaError::invalid("max_iters must be at least 1"));
        }
        Ok(())
    }
}

impl<M, T> EigenSolver<M> for PowerIterator<T>
where
    M: MatVec<Vec<T>> + MatShape,
    (): InnerProduct<Vec<T>, Scalar = T>,
    T: Float + From<f64>,
{
    type Scalar = T;
    type Error = PcaError;

    /// Run power iteration on `a`, which is only read.
    ///
    /// # Returns
    /// * `Ok((pair, stats))` when converged, or when the cap was reached and `strict` is off
    /// * `Err(PcaError::DegenerateIteration)` when `A·x` vanishes
    /// * `Err(PcaError::NotConverged)` when the cap was reached and `strict` is on
    fn dominant(&mut self, a: &M) -> Result<(EigenPair<T>, IterStats<T>), PcaError> {
        self.validate()?;
        let n = a.nrows();
        if n != a.ncols() {
            return Err(PcaError::invalid(format!(
                "power iteration needs a square matrix, got {}x{}",
                n,
                a.ncols()
            )));
        }
        if n == 0 {
            return Err(PcaError::invalid("power iteration needs a non-empty matrix"));
        }

        let ip = ();
        let mut x = vec![T::one(); n];
        let mut w = vec![T::zero(); n];
        let mut k = T::zero();
        let mut stats = IterStats {
            iterations: 0,
            final_error: T::infinity(),
            converged: false,
        };

        for i in 1..=self.conv.max_iters {
            a.matvec(&x, &mut w);
            // Rayleigh quotient on the pre-update candidate
            k = ip.dot(&w, &x) / ip.dot(&x, &x);

            let w_norm = ip.norm(&w);
            if !(w_norm > T::min_positive_value()) || !w_norm.is_finite() {
                return Err(PcaError::DegenerateIteration { iteration: i });
            }

            let mut err_sq = T::zero();
            for (xj, &wj) in x.iter_mut().zip(w.iter()) {
                let next = wj / w_norm;
                let d = next - *xj;
                err_sq = err_sq + d * d;
                *xj = next;
            }
            let error = err_sq.sqrt();
            trace!("power iter {i}: lambda={:.6e}, error={:.3e}", as_f64(k), as_f64(error));

            let (stop, s) = self.conv.check(error, i);
            stats = s;
            if stop {
                break;
            }
        }

        if self.estimate == EigenvalueEstimate::Final {
            a.matvec(&x, &mut w);
            k = ip.dot(&w, &x) / ip.dot(&x, &x);
        }

        if !stats.converged {
            warn!(
                "power iteration stopped at the cap of {} iterations (error {:.3e})",
                stats.iterations,
                as_f64(stats.final_error)
            );
            if self.strict {
                return Err(PcaError::NotConverged {
                    iterations: stats.iterations,
                    error: as_f64(stats.final_error),
                });
            }
        }

        Ok((EigenPair { value: k, vector: x }, stats))
    }
}
