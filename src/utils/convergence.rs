//! Convergence tracking & tolerance checks for power iteration.

/// Stopping criteria & stats.
#[derive(Clone, Debug)]
pub struct Convergence<T> {
    pub tol: T,
    pub max_iters: usize,
}

#[derive(Clone, Debug)]
pub struct IterStats<T> {
    pub iterations: usize,
    pub final_error: T,
    pub converged: bool,
}

impl<T: Copy + num_traits::Float> Convergence<T> {
    /// Returns (should_stop, stats) given the step `error` ‖xₖ − xₖ₋₁‖ at iteration `i`.
    ///
    /// Stopping on the iteration cap does not count as converged.
    pub fn check(&self, error: T, i: usize) -> (bool, IterStats<T>) {
        let converged = error <= self.tol;
        let stop = converged || i >= self.max_iters;
        (
            stop,
            IterStats {
                iterations: i,
                final_error: error,
                converged,
            },
        )
    }
}
