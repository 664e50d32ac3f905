//! Variance-driven deflation over power iteration.
//!
//! `SpectralExtractor` owns a private working copy of a covariance matrix. Each step runs a
//! [`PowerIterator`] on the working matrix, records the eigenpair, deflates with
//! `A ← A − λ·v·vᵀ` and adds `λ` to the captured variance. The loop stops once the captured
//! variance reaches `target_fraction · trace(A₀)`, the component bound is hit, or the caller
//! asks to stop between steps.
//!
//! Eigenpairs come out in decreasing eigenvalue order because each deflation removes the current
//! dominant component; nothing is sorted afterwards.

use std::ops::ControlFlow;

use bitflags::bitflags;
use faer::Mat;
use log::{debug, warn};
use num_traits::Float;

use crate::config::ExtractOptions;
use crate::core::traits::{InnerProduct, MatShape, MatVec};
use crate::eigen::{as_f64, EigenPair, EigenSolver, PowerIterator};
use crate::error::PcaError;
use crate::matrix::DenseMatrix;
use crate::utils::convergence::IterStats;

bitflags! {
    /// Non-fatal conditions met while extracting.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct ExtractionStatus: u32 {
        /// At least one power iteration stopped at its cap
        const NOT_CONVERGED = 0b0001;
        /// Extraction ended before the target variance was captured
        const PARTIAL       = 0b0010;
        /// The caller stopped the loop between deflation steps
        const CANCELLED     = 0b0100;
    }
}

/// Outcome of an extraction run.
#[derive(Debug, Clone)]
pub struct Extraction<T> {
    /// Eigenpairs in extraction order (decreasing eigenvalue)
    pub pairs: Vec<EigenPair<T>>,
    /// d×k matrix whose columns are the eigenvectors
    pub basis: Mat<T>,
    /// Trace of the input matrix
    pub total_variance: T,
    /// Sum of extracted eigenvalues
    pub captured_variance: T,
    pub status: ExtractionStatus,
}

impl<T: Float + Send + Sync> Extraction<T> {
    pub fn n_components(&self) -> usize {
        self.pairs.len()
    }

    pub fn eigenvalues(&self) -> Vec<T> {
        self.pairs.iter().map(|p| p.value).collect()
    }

    /// Per-component share of the total variance.
    pub fn explained_variance_ratio(&self) -> Vec<T> {
        self.pairs.iter().map(|p| p.value / self.total_variance).collect()
    }

    pub fn captured_fraction(&self) -> T {
        self.captured_variance / self.total_variance
    }

    pub fn is_partial(&self) -> bool {
        self.status.contains(ExtractionStatus::PARTIAL)
    }

    /// Project `data` (n×d) onto the retained basis, giving n×k.
    pub fn project(&self, data: &Mat<T>) -> Result<Mat<T>, PcaError> {
        project(data, &self.basis)
    }
}

/// Repeated power iteration with rank-one deflation.
pub struct SpectralExtractor<T> {
    work: Mat<T>,
    total_variance: T,
    captured: T,
    pairs: Vec<EigenPair<T>>,
    solver: PowerIterator<T>,
    max_components: usize,
    status: ExtractionStatus,
}

impl<T> SpectralExtractor<T>
where
    T: Float + From<f64> + Send + Sync,
    (): InnerProduct<Vec<T>, Scalar = T>,
{
    /// Copy `covariance` into a private working matrix.
    ///
    /// Fails with `InvalidArgument` on a non-square, empty or non-finite matrix, or on invalid
    /// iteration parameters.
    pub fn new(covariance: &Mat<T>, opts: &ExtractOptions<T>) -> Result<Self, PcaError> {
        let solver = PowerIterator::from_options(opts);
        solver.validate()?;
        if !DenseMatrix::is_square(covariance) {
            return Err(PcaError::invalid(format!(
                "covariance must be square, got {}x{}",
                covariance.nrows(),
                covariance.ncols()
            )));
        }
        let d = covariance.nrows();
        if d == 0 {
            return Err(PcaError::invalid("covariance must be non-empty"));
        }
        if !covariance.all_finite() {
            return Err(PcaError::invalid("covariance contains NaN or infinite entries"));
        }
        let max_components = opts.max_components.map_or(d, |m| m.min(d));
        if max_components == 0 {
            return Err(PcaError::invalid("max_components must be at least 1"));
        }

        Ok(Self {
            work: covariance.clone(),
            total_variance: DenseMatrix::trace(covariance),
            captured: T::zero(),
            pairs: Vec::with_capacity(max_components),
            solver,
            max_components,
            status: ExtractionStatus::empty(),
        })
    }

    pub fn total_variance(&self) -> T {
        self.total_variance
    }

    pub fn captured_variance(&self) -> T {
        self.captured
    }

    pub fn pairs(&self) -> &[EigenPair<T>] {
        &self.pairs
    }

    /// The deflated working matrix.
    pub fn residual(&self) -> &Mat<T> {
        &self.work
    }

    pub fn status(&self) -> ExtractionStatus {
        self.status
    }

    /// Whether `target_fraction` of the total variance has been captured.
    ///
    /// The comparison allows `√ε·|total|` of rounding loss: the lagged Rayleigh estimate leaves
    /// O(λ·step²) of every component in the residual, so a fraction of 1.0 would otherwise never
    /// be met. The slack does not depend on the iteration tolerance.
    pub fn target_reached(&self, target_fraction: T) -> bool {
        let slack = T::epsilon().sqrt() * self.total_variance.abs();
        self.captured >= target_fraction * self.total_variance - slack
    }

    /// Extract one more component and deflate.
    ///
    /// Returns `Ok(None)` once the component bound has been reached.
    pub fn next_component(&mut self) -> Result<Option<(EigenPair<T>, IterStats<T>)>, PcaError> {
        if self.pairs.len() >= self.max_components {
            return Ok(None);
        }
        let (pair, stats) = self.solver.dominant(&self.work)?;
        if !stats.converged {
            self.status |= ExtractionStatus::NOT_CONVERGED;
        }

        self.work.rank_one_update(pair.value, &pair.vector);
        self.captured = self.captured + pair.value;
        self.pairs.push(pair.clone());

        debug!(
            "component {}: lambda={:.6e} after {} iterations, captured {:.4} of total",
            self.pairs.len(),
            as_f64(pair.value),
            stats.iterations,
            as_f64(self.captured / self.total_variance)
        );
        Ok(Some((pair, stats)))
    }

    /// Extract until `target_fraction` of the trace is captured.
    pub fn extract(&mut self, target_fraction: T) -> Result<Extraction<T>, PcaError> {
        self.extract_with(target_fraction, |_, _| ControlFlow::Continue(()))
    }

    /// Like [`extract`](Self::extract), calling `on_component(pair, captured_variance)` after
    /// every deflation step. Returning `ControlFlow::Break` stops the loop and flags the result
    /// `CANCELLED`.
    ///
    /// At least one component is always attempted. A failure on the first component is returned
    /// as an error; a later failure truncates the result and flags it `PARTIAL`.
    pub fn extract_with<F>(
        &mut self,
        target_fraction: T,
        mut on_component: F,
    ) -> Result<Extraction<T>, PcaError>
    where
        F: FnMut(&EigenPair<T>, T) -> ControlFlow<()>,
    {
        validate_fraction(target_fraction)?;

        loop {
            if !self.pairs.is_empty() && self.target_reached(target_fraction) {
                break;
            }
            match self.next_component() {
                Ok(Some((pair, _))) => {
                    if on_component(&pair, self.captured).is_break() {
                        self.status |= ExtractionStatus::CANCELLED;
                        break;
                    }
                }
                Ok(None) => {
                    warn!(
                        "stopped at {} components with {:.4} of the variance captured",
                        self.pairs.len(),
                        as_f64(self.captured / self.total_variance)
                    );
                    self.status |= ExtractionStatus::PARTIAL;
                    break;
                }
                Err(e) if self.pairs.is_empty() => return Err(e),
                Err(e) => {
                    warn!("extraction truncated after {} components: {e}", self.pairs.len());
                    self.status |= ExtractionStatus::PARTIAL;
                    break;
                }
            }
        }

        Ok(self.snapshot())
    }

    fn snapshot(&self) -> Extraction<T> {
        let d = self.work.nrows();
        let pairs = self.pairs.clone();
        let basis = Mat::from_fn(d, pairs.len(), |i, j| pairs[j].vector[i]);
        Extraction {
            pairs,
            basis,
            total_variance: self.total_variance,
            captured_variance: self.captured,
            status: self.status,
        }
    }
}

fn validate_fraction<T: Float>(target_fraction: T) -> Result<(), PcaError> {
    if target_fraction > T::zero() && target_fraction <= T::one() {
        Ok(())
    } else {
        Err(PcaError::invalid(format!(
            "target fraction must lie in (0, 1], got {}",
            as_f64(target_fraction)
        )))
    }
}

/// Extract eigenpairs of `covariance` until `target_fraction` of its trace is captured,
/// using default options. The caller's matrix is never modified.
pub fn extract<T>(covariance: &Mat<T>, target_fraction: T) -> Result<Extraction<T>, PcaError>
where
    T: Float + From<f64> + Send + Sync,
    (): InnerProduct<Vec<T>, Scalar = T>,
{
    validate_fraction(target_fraction)?;
    SpectralExtractor::new(covariance, &ExtractOptions::default())?.extract(target_fraction)
}

/// Compute `data · basis` (n×d times d×k) one basis column at a time.
pub fn project<T>(data: &Mat<T>, basis: &Mat<T>) -> Result<Mat<T>, PcaError>
where
    T: Float + Send + Sync,
{
    let (n, d) = (MatShape::nrows(data), MatShape::ncols(data));
    if d != basis.nrows() {
        return Err(PcaError::invalid(format!(
            "data has {} columns but the basis has {} rows",
            d,
            basis.nrows()
        )));
    }
    let k = basis.ncols();
    let mut out = Mat::from_fn(n, k, |_, _| T::zero());
    let mut y = vec![T::zero(); n];
    for j in 0..k {
        let v: Vec<T> = (0..d).map(|i| basis[(i, j)]).collect();
        data.matvec(&v, &mut y);
        for (i, &yi) in y.iter().enumerate() {
            out[(i, j)] = yi;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two() -> Mat<f64> {
        DenseMatrix::from_rows(&[vec![3.0, 0.0], vec![0.0, 1.0]])
    }

    #[test]
    fn full_fraction_returns_both_components() {
        let m = two_by_two();
        let ex = extract(&m, 1.0).unwrap();
        assert_eq!(ex.n_components(), 2);
        assert!(ex.status.is_empty(), "status = {:?}", ex.status);
        assert!((ex.pairs[0].value - 3.0).abs() < 1e-6);
        assert!((ex.pairs[1].value - 1.0).abs() < 1e-6);
        assert!((ex.pairs[0].vector[0].abs() - 1.0).abs() < 1e-6);
        assert!((ex.pairs[1].vector[1].abs() - 1.0).abs() < 1e-6);
        assert!((ex.captured_variance - 4.0).abs() < 1e-6);
        assert_eq!(ex.total_variance, 4.0);
        // caller's matrix is untouched
        assert_eq!(m[(0, 0)], 3.0);
    }

    #[test]
    fn half_fraction_stops_after_first_component() {
        let ex = extract(&two_by_two(), 0.5).unwrap();
        assert_eq!(ex.n_components(), 1);
        assert!((ex.eigenvalues()[0] - 3.0).abs() < 1e-6);
        assert_eq!(ex.basis.ncols(), 1);
        assert!((ex.captured_fraction() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn residual_trace_vanishes_after_full_deflation() {
        let m: Mat<f64> = DenseMatrix::from_rows(&[
            vec![4.0, 1.0, 0.0],
            vec![1.0, 3.0, 1.0],
            vec![0.0, 1.0, 2.0],
        ]);
        let opts = ExtractOptions::new(1e-10, 10_000);
        let mut ex = SpectralExtractor::new(&m, &opts).unwrap();
        let out = ex.extract(1.0).unwrap();
        assert_eq!(out.n_components(), 3);
        assert!(DenseMatrix::trace(ex.residual()).abs() < 1e-6);
        let values = out.eigenvalues();
        assert!(values[0] > values[1] && values[1] > values[2]);
    }

    #[test]
    fn rejects_bad_fraction_and_shape() {
        let m = two_by_two();
        assert!(matches!(extract(&m, 0.0), Err(PcaError::InvalidArgument(_))));
        assert!(matches!(extract(&m, 1.5), Err(PcaError::InvalidArgument(_))));
        let r = Mat::from_fn(3, 2, |_, _| 1.0f64);
        assert!(matches!(extract(&r, 0.9), Err(PcaError::InvalidArgument(_))));
    }

    #[test]
    fn zero_matrix_surfaces_degenerate_iteration() {
        let z = Mat::from_fn(3, 3, |_, _| 0.0f64);
        assert_eq!(
            extract(&z, 0.9).unwrap_err(),
            PcaError::DegenerateIteration { iteration: 1 }
        );
    }

    #[test]
    fn degeneracy_after_first_component_is_partial() {
        // the all-ones start is the eigenvector of λ = 1, and the deflated residual maps it to zero
        let m: Mat<f64> = DenseMatrix::from_rows(&[vec![2.0, -1.0], vec![-1.0, 2.0]]);
        let mut ex = SpectralExtractor::new(&m, &ExtractOptions::default()).unwrap();
        let out = ex.extract(1.0).unwrap();
        assert_eq!(out.n_components(), 1);
        assert!((out.pairs[0].value - 1.0).abs() < 1e-12);
        assert!(out.is_partial());
    }

    #[test]
    fn strict_non_convergence_on_first_component_is_an_error() {
        // eigenvalue ratio 0.99 needs far more than 40 iterations
        let m: Mat<f64> = DenseMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 0.99]]);
        let opts = ExtractOptions::new(1e-6, 40).strict(true);
        let mut ex = SpectralExtractor::new(&m, &opts).unwrap();
        assert!(matches!(
            ex.extract(0.5),
            Err(PcaError::NotConverged { iterations: 40, .. })
        ));
    }

    #[test]
    fn strict_non_convergence_after_first_component_is_partial() {
        let m: Mat<f64> = DenseMatrix::from_rows(&[
            vec![4.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 0.99],
        ]);
        let opts = ExtractOptions::new(1e-6, 40).strict(true);
        let mut ex = SpectralExtractor::new(&m, &opts).unwrap();
        let out = ex.extract(0.9).unwrap();
        assert_eq!(out.n_components(), 1);
        assert!((out.pairs[0].value - 4.0).abs() < 1e-6);
        assert!(out.is_partial());
        assert!(!out.status.contains(ExtractionStatus::NOT_CONVERGED));
    }

    #[test]
    fn unflagged_result_meets_the_target() {
        for tol in [1e-6, 1e-2, 0.1] {
            for target in [0.3, 0.5, 0.75, 0.7500001, 0.8, 0.95, 1.0] {
                let opts = ExtractOptions::new(tol, 1000);
                let mut ex = SpectralExtractor::new(&two_by_two(), &opts).unwrap();
                let out = ex.extract(target).unwrap();
                if !out.is_partial() {
                    assert!(
                        out.captured_fraction() >= target - f64::EPSILON.sqrt(),
                        "tol {tol}, target {target}: captured {}",
                        out.captured_fraction()
                    );
                }
            }
        }
        // a loose tolerance leaves the first estimate well below 3/4 of the trace
        let mut ex = SpectralExtractor::new(&two_by_two(), &ExtractOptions::new(0.1, 1000)).unwrap();
        assert_eq!(ex.extract(0.8).unwrap().n_components(), 2);
        assert_eq!(extract(&two_by_two(), 0.7500001).unwrap().n_components(), 2);
    }

    #[test]
    fn component_bound_flags_partial() {
        let opts = ExtractOptions::default().with_max_components(1);
        let mut ex = SpectralExtractor::new(&two_by_two(), &opts).unwrap();
        let out = ex.extract(1.0).unwrap();
        assert_eq!(out.n_components(), 1);
        assert!(out.status.contains(ExtractionStatus::PARTIAL));
    }

    #[test]
    fn callback_can_cancel_between_steps() {
        let m = two_by_two();
        let mut ex = SpectralExtractor::new(&m, &ExtractOptions::default()).unwrap();
        let mut seen = 0;
        let out = ex
            .extract_with(1.0, |_, _| {
                seen += 1;
                ControlFlow::Break(())
            })
            .unwrap();
        assert_eq!(seen, 1);
        assert_eq!(out.n_components(), 1);
        assert_eq!(out.status, ExtractionStatus::CANCELLED);
    }

    #[test]
    fn project_rejects_mismatched_basis() {
        let data = Mat::from_fn(4, 3, |i, j| (i + j) as f64);
        let basis = Mat::from_fn(2, 1, |_, _| 1.0f64);
        assert!(matches!(project(&data, &basis), Err(PcaError::InvalidArgument(_))));
    }
}
