//! Options for power iteration, deflation and the PCA pipeline.

pub mod options;
pub use options::{EigenvalueEstimate, ExtractOptions, PcaOptions};
