//! Core traits and their implementations for Faer matrices and `Vec<T>`.

pub mod traits;
pub mod wrappers;

pub use traits::{InnerProduct, MatShape, MatVec};
