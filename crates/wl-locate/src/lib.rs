//! wl-locate: iterative L1-approximation leak localization.
//!
//! Pipeline per outer iteration:
//! 1. `scenario` draws synthetic leaks and a sensor subset.
//! 2. Baseline and leaky hydraulic runs give the pressure residual `b`.
//! 3. `sensitivity` probes each candidate node with a single emitter to
//!    build the finite-difference matrix `A`.
//! 4. `assemble` turns `A`, `b` into the doubled L1 program, plus big-M
//!    indicators and a cardinality cap for MIP polishing.
//! 5. `controller` alternates rebuild/solve rounds while the objective
//!    keeps improving, updating probe magnitudes through a `policy`.
//! 6. `evaluate` scores the recovered magnitudes against the truth.
//!
//! `experiment` drives all of this over iterations and analysis windows,
//! with optional `near_optima` re-costing and a `heatmap` summary.

pub mod assemble;
pub mod config;
pub mod controller;
pub mod error;
pub mod evaluate;
pub mod event;
pub mod experiment;
pub mod heatmap;
pub mod near_optima;
pub mod policy;
pub mod scenario;
pub mod sensitivity;

pub use assemble::{ConstraintAssembler, L1Layout, doubled_system};
pub use config::{DeltaPolicy, ExperimentConfig, ProbeConfig, RefinementConfig, ScenarioConfig};
pub use controller::{
    IterationController, IterationState, Phase, PhaseSolution, RoundFailure, RoundRecord,
    WindowOutcome,
};
pub use error::{LocateError, LocateResult};
pub use evaluate::{model_error, per_node_error};
pub use event::LocateEvent;
pub use experiment::{ExperimentReport, IterationRecord, LeakDemand, WindowRecord, run_experiment};
pub use heatmap::HeatMap;
pub use near_optima::{NearOptimaTable, near_optima_table};
pub use policy::{floor_deltas, leak_limit, top_k_distinct};
pub use scenario::{LeakScenario, ScenarioGenerator, SensorSet};
pub use sensitivity::{SensitivityBuilder, SensitivityPass};
