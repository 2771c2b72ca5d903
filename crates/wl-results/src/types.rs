//! Result data types.
//!
//! Flat row types map one-to-one onto CSV columns; `IterationSummary` is
//! the structured per-iteration record.

use serde::{Deserialize, Serialize};

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: RunId,
    pub project_name: String,
    pub content_hash: String,
    pub timestamp: String,
    pub solver: String,
    pub solver_version: String,
    pub seed: u64,
    pub iterations: usize,
    pub windows: usize,
    pub mean_error: f64,
    pub simulations: usize,
    pub elapsed_s: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeakSummary {
    pub node: String,
    pub magnitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowSummary {
    pub window: usize,
    pub start_s: f64,
    pub points: usize,
    pub lp_objective: Option<f64>,
    pub mip_objective: Option<f64>,
    pub rounds: usize,
    pub reliable: bool,
    pub error: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
    /// Recovered magnitude per junction, in junction order
    pub solution: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IterationSummary {
    pub iteration: usize,
    pub leaks: Vec<LeakSummary>,
    pub sensors: Vec<String>,
    pub windows: Vec<WindowSummary>,
    pub demand: Vec<LeakRow>,
    pub mean_error: f64,
    pub elapsed_s: f64,
    pub simulations: usize,
}

/// One junction's estimate in one window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimateRow {
    pub window: usize,
    pub node: String,
    pub mip_x: Option<f64>,
    pub lp_x: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeakRow {
    pub window: usize,
    pub node: String,
    pub magnitude: f64,
    pub leak_lps: f64,
    pub total_lps: f64,
    pub fraction_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorRow {
    pub iteration: usize,
    pub window: usize,
    pub lp_objective: Option<f64>,
    pub mip_objective: Option<f64>,
    pub model_error: f64,
    pub reliable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NearOptimaRow {
    pub solution_window: usize,
    pub cost_window: usize,
    pub objective: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeatRow {
    pub node: String,
    pub lp_sum: f64,
    pub mip_sum: f64,
    pub weighted: f64,
    pub lp_norm: f64,
    pub mip_norm: f64,
    pub weighted_norm: f64,
    pub hits: usize,
}

/// Everything written for one iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationReport {
    pub summary: IterationSummary,
    pub estimates: Vec<EstimateRow>,
    pub near_optima: Vec<NearOptimaRow>,
    pub heat_map: Vec<HeatRow>,
}
