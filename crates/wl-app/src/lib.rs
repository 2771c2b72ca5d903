//! Shared application service layer for waterleak.
//!
//! Frontends go through this crate to load and validate projects, compile
//! the network into a hydraulic model, run leak-localization experiments
//! and persist or query their results.

pub mod error;
pub mod progress;
pub mod project_service;
pub mod report;
pub mod run_service;

pub use error::{AppError, AppResult};
pub use progress::{LocateProgress, RunProgressEvent, RunStage};
pub use project_service::{
    ProjectSummary, build_network, experiment_config, load_project, save_project, summarize,
    validate_project,
};
pub use run_service::{
    RunOptions, RunOverrides, RunRequest, RunResponse, RunTimingSummary, list_runs, load_run,
    run, run_with_progress,
};
