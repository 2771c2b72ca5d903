//! Error types for leak localization.

use thiserror::Error;
use wl_hydraulics::HydraulicError;
use wl_optim::OptimError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocateError {
    #[error("Degenerate probe magnitude at node {node}: {value}")]
    DegenerateProbeMagnitude { node: usize, value: f64 },

    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Scenario error: {what}")]
    Scenario { what: String },

    #[error("Invalid configuration: {what}")]
    InvalidConfig { what: String },

    #[error("Hydraulic error: {0}")]
    Hydraulic(#[from] HydraulicError),

    #[error("Optimization error: {0}")]
    Optim(#[from] OptimError),

    #[error("Core error: {0}")]
    Core(#[from] wl_core::WlError),
}

pub type LocateResult<T> = Result<T, LocateError>;

pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> LocateResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(LocateError::DimensionMismatch {
            what,
            expected,
            actual,
        })
    }
}
