//! Options for eigenpair extraction and the PCA pipeline.
//!
//! `ExtractOptions` carries the extraction-wide constants handed to every power iteration
//! (tolerance, iteration cap), the component bound for the deflation loop, and the eigenvalue
//! estimate policy. `PcaOptions` adds the retained-variance fraction and centering switch.

use num_traits::Float;

/// Which vector the reported eigenvalue is estimated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EigenvalueEstimate {
    /// Rayleigh quotient of the vector *before* the last update (one step behind).
    #[default]
    Lagged,
    /// Recompute the Rayleigh quotient from the returned vector on exit.
    Final,
}

/// Power iteration & deflation parameters.
#[derive(Debug, Clone)]
pub struct ExtractOptions<T> {
    /// Convergence tolerance on ‖xₖ − xₖ₋₁‖₂
    pub tol: T,

    /// Iteration cap for a single power iteration
    pub max_iters: usize,

    /// Upper bound on extracted components; always clamped to the matrix dimension
    pub max_components: Option<usize>,

    /// Eigenvalue estimate policy
    pub estimate: EigenvalueEstimate,

    /// Raise `NotConverged` instead of returning the best estimate
    pub strict: bool,
}

impl<T: Float + From<f64>> Default for ExtractOptions<T> {
    fn default() -> Self {
        Self {
            tol: 1e-6_f64.into(),
            max_iters: 1000,
            max_components: None,
            estimate: EigenvalueEstimate::Lagged,
            strict: false,
        }
    }
}

impl<T: Float + From<f64>> ExtractOptions<T> {
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self { tol, max_iters, ..Self::default() }
    }

    pub fn with_max_components(mut self, max_components: usize) -> Self {
        self.max_components = Some(max_components);
        self
    }

    pub fn with_estimate(mut self, estimate: EigenvalueEstimate) -> Self {
        self.estimate = estimate;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// PCA pipeline parameters.
#[derive(Debug, Clone)]
pub struct PcaOptions<T> {
    /// Fraction of total variance to retain, in (0, 1]
    pub target_fraction: T,

    /// Subtract column means before computing the covariance
    pub center: bool,

    pub extract: ExtractOptions<T>,
}

impl<T: Float + From<f64>> Default for PcaOptions<T> {
    fn default() -> Self {
        Self {
            target_fraction: 0.8_f64.into(),
            center: true,
            extract: ExtractOptions::default(),
        }
    }
}

impl<T: Float + From<f64>> PcaOptions<T> {
    pub fn new(target_fraction: T) -> Self {
        Self { target_fraction, ..Self::default() }
    }

    pub fn center(mut self, center: bool) -> Self {
        self.center = center;
        self
    }

    pub fn with_extract(mut self, extract: ExtractOptions<T>) -> Self {
        self.extract = extract;
        self
    }
}
