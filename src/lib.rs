//! powerpca: variance-targeted principal components over Faer
//!
//! This crate extracts the dominant eigenpairs of a covariance matrix with power iteration and
//! rank-one deflation, stopping once a requested fraction of the total variance (the trace) has
//! been captured, and projects data onto the retained eigenvectors. Matrix–vector products are the
//! only numerical primitive; no dense eigen-decomposition is used.

pub mod config;
pub mod core;
pub mod eigen;
pub mod error;
pub mod matrix;
pub mod pca;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use self::core::*;
pub use eigen::*;
pub use error::*;
pub use matrix::*;
pub use pca::Pca;

// Re-export IterStats at the crate root for convenience
pub use utils::convergence::IterStats;
