//! Error types for optimization.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimError {
    #[error("Invalid program: {what}")]
    InvalidProgram { what: String },

    #[error("Solver backend error: {message}")]
    Backend { message: String },
}

pub type OptimResult<T> = Result<T, OptimError>;

impl OptimError {
    /// Backend faults may be transient; a malformed program never is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OptimError::Backend { .. })
    }
}
