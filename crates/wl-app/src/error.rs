//! Error types for the wl-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the backend crates and
/// gives frontends one error surface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to read project file: {path}")]
    ProjectFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Hydraulic error: {0}")]
    Hydraulic(String),

    #[error("Localization error: {0}")]
    Locate(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for wl-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<wl_project::ProjectError> for AppError {
    fn from(err: wl_project::ProjectError) -> Self {
        match err {
            wl_project::ProjectError::Io(source) => AppError::Io(source),
            other => AppError::Project(other.to_string()),
        }
    }
}

impl From<wl_network::NetworkError> for AppError {
    fn from(err: wl_network::NetworkError) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<wl_hydraulics::HydraulicError> for AppError {
    fn from(err: wl_hydraulics::HydraulicError) -> Self {
        AppError::Hydraulic(err.to_string())
    }
}

impl From<wl_locate::LocateError> for AppError {
    fn from(err: wl_locate::LocateError) -> Self {
        AppError::Locate(err.to_string())
    }
}

impl From<wl_results::ResultsError> for AppError {
    fn from(err: wl_results::ResultsError) -> Self {
        match err {
            wl_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}
