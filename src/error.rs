use thiserror::Error;

// Unified error type for powerpca

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PcaError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("degenerate iteration at step {iteration}: A·x vanished or is not finite")]
    DegenerateIteration { iteration: usize },
    #[error("power iteration did not converge after {iterations} iterations (error {error:e})")]
    NotConverged { iterations: usize, error: f64 },
    #[error("model has not been fitted yet")]
    NotFitted,
}

impl PcaError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        PcaError::InvalidArgument(msg.into())
    }
}
