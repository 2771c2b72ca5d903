//! Project schema definitions.
//!
//! Units are carried in field names: `_m` metres, `_mm` millimetres,
//! `_lps` litres per second, `_s` seconds, `_h` hours.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub version: u32,
    pub name: String,
    pub network: NetworkDef,
    #[serde(default)]
    pub experiment: ExperimentDef,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NetworkDef {
    #[serde(default)]
    pub junctions: Vec<JunctionDef>,
    #[serde(default)]
    pub reservoirs: Vec<ReservoirDef>,
    #[serde(default)]
    pub tanks: Vec<TankDef>,
    #[serde(default)]
    pub pipes: Vec<PipeDef>,
    #[serde(default)]
    pub patterns: Vec<PatternDef>,
    #[serde(default)]
    pub options: TimeOptionsDef,
}

impl NetworkDef {
    /// Ids of every node, in declaration order: junctions, reservoirs, tanks.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.junctions
            .iter()
            .map(|j| j.id.as_str())
            .chain(self.reservoirs.iter().map(|r| r.id.as_str()))
            .chain(self.tanks.iter().map(|t| t.id.as_str()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JunctionDef {
    pub id: String,
    pub elevation_m: f64,
    #[serde(default)]
    pub base_demand_lps: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default)]
    pub emitter_coeff: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReservoirDef {
    pub id: String,
    pub head_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TankDef {
    pub id: String,
    pub elevation_m: f64,
    pub init_level_m: f64,
    #[serde(default)]
    pub min_level_m: f64,
    pub max_level_m: f64,
    pub diameter_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipeDef {
    pub id: String,
    pub from: String,
    pub to: String,
    pub length_m: f64,
    pub diameter_mm: f64,
    /// Hazen-Williams C
    pub roughness: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternDef {
    pub id: String,
    pub multipliers: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeOptionsDef {
    pub duration_h: f64,
    pub hydraulic_step_s: f64,
    pub pattern_step_s: f64,
}

impl Default for TimeOptionsDef {
    fn default() -> Self {
        Self {
            duration_h: 96.0,
            hydraulic_step_s: 3600.0,
            pattern_step_s: 3600.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyDef {
    TopKAverage,
    #[default]
    CarryForward,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExperimentDef {
    pub seed: u64,
    pub iterations: usize,
    pub num_leaks: usize,
    pub min_leak_size: f64,
    pub max_leak_size: f64,
    pub ignore_nodes: Vec<String>,
    pub sensor_fraction: f64,
    pub warmup_h: f64,
    pub time_points: usize,
    pub periods: usize,
    /// Spacing between analysis windows; defaults to `time_points` steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_hours: Option<f64>,
    pub near_optima: bool,
    pub parallel_probes: bool,
    pub probe_stride: usize,
    pub output_dir: String,
    pub refinement: RefinementDef,
}

impl Default for ExperimentDef {
    fn default() -> Self {
        Self {
            seed: 42,
            iterations: 1,
            num_leaks: 2,
            min_leak_size: 1.0,
            max_leak_size: 10.0,
            ignore_nodes: Vec::new(),
            sensor_fraction: 1.0,
            warmup_h: 72.0,
            time_points: 4,
            periods: 1,
            period_hours: None,
            near_optima: false,
            parallel_probes: false,
            probe_stride: 1,
            output_dir: "runs".to_string(),
            refinement: RefinementDef::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RefinementDef {
    pub lp_policy: PolicyDef,
    /// Falls back to carry-forward when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mip_policy: Option<PolicyDef>,
    pub initial_delta: f64,
    pub min_leak_threshold: f64,
    pub indicator_threshold: f64,
    pub max_rounds: usize,
    pub min_improvement: f64,
    pub mip_polish: bool,
    pub warm_start: bool,
    pub big_m_safety_factor: f64,
    pub big_m_retries: usize,
    pub min_probe_magnitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leak_limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_budget_s: Option<f64>,
}

impl Default for RefinementDef {
    fn default() -> Self {
        Self {
            lp_policy: PolicyDef::CarryForward,
            mip_policy: None,
            initial_delta: 1.0,
            min_leak_threshold: 0.1,
            indicator_threshold: 0.5,
            max_rounds: 25,
            min_improvement: 1e-6,
            mip_polish: true,
            warm_start: true,
            big_m_safety_factor: 10.0,
            big_m_retries: 1,
            min_probe_magnitude: 1e-3,
            leak_limit: None,
            round_budget_s: None,
        }
    }
}
