//! wl-hydraulics: hydraulic engine for waterleak.
//!
//! Provides:
//! - Hazen-Williams and emitter head-loss laws
//! - Gradient-method (Newton) steady snapshot solver
//! - Extended-period simulation with demand patterns and tank levels
//! - Analysis windows that average time-stepped readings
//! - The `HydraulicModel` trait consumed by the localization core, with a
//!   scoped emitter guard for single-leak probes

pub mod compile;
pub mod eps;
pub mod error;
pub mod gga;
pub mod headloss;
pub mod model;
pub mod window;

pub use compile::{HydraulicNetwork, LinkEnd};
pub use eps::{SimOptions, SimulationRecord, run_extended};
pub use error::{HydraulicError, HydraulicResult};
pub use gga::{GgaConfig, SteadyInput, SteadySolution, solve_steady};
pub use model::{EmitterGuard, HydraulicModel, NetworkModel};
pub use window::{AnalysisWindow, NodeReadings, average_window, schedule_windows};
