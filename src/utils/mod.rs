//! Iteration bookkeeping shared by the eigen solvers.

pub mod convergence;
