//! Error types for hydraulic simulation.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HydraulicError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error("Hydraulics did not converge at t={time_s}s: {what}")]
    ConvergenceFailed { time_s: f64, what: String },

    #[error("Numeric error: {what}")]
    Numeric { what: String },

    #[error("Node index {index} out of range (node count {len})")]
    NodeOutOfRange { index: usize, len: usize },

    #[error("Analysis window starting at {start_s}s needs {points} samples, only {available} available")]
    WindowOutOfRange {
        start_s: f64,
        points: usize,
        available: usize,
    },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Network error: {0}")]
    Network(#[from] wl_network::NetworkError),

    #[error("Core error: {0}")]
    Core(#[from] wl_core::WlError),
}

pub type HydraulicResult<T> = Result<T, HydraulicError>;

impl HydraulicError {
    /// Non-convergence may clear with relaxed tolerances; everything else is permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HydraulicError::ConvergenceFailed { .. })
    }
}
