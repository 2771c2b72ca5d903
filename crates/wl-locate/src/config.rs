//! Tunables for scenario generation, probing and refinement.

use serde::{Deserialize, Serialize};
use wl_hydraulics::AnalysisWindow;

use crate::error::{LocateError, LocateResult};

/// How the next round's probe magnitudes are derived from a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaPolicy {
    /// Average the K largest distinct magnitudes and use it for every node.
    TopKAverage,
    /// Keep each node's own magnitude when above the leak threshold.
    #[default]
    CarryForward,
}

#[derive(Debug, Clone)]
pub struct RefinementConfig {
    pub lp_policy: DeltaPolicy,
    pub mip_policy: DeltaPolicy,
    /// Probe magnitude used before any solution exists
    pub initial_delta: f64,
    /// Carry-forward keeps magnitudes above this value
    pub min_leak_threshold: f64,
    /// A candidate counts toward the leak limit above this value
    pub indicator_threshold: f64,
    /// Round cap per phase
    pub max_rounds: usize,
    /// A round is accepted only if it lowers the objective by more than this
    pub min_improvement: f64,
    pub mip_polish: bool,
    pub warm_start: bool,
    /// Largest physically plausible leak magnitude, used to scale big-M
    pub max_plausible_leak: f64,
    pub big_m_safety_factor: f64,
    /// Extra attempts with big-M scaled ×10 after an infeasible MIP round
    pub big_m_retries: usize,
    /// Fixed cardinality cap; `None` derives it from the LP phase
    pub leak_limit: Option<usize>,
    /// Wall-clock budget per outer iteration
    pub round_budget_s: Option<f64>,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            lp_policy: DeltaPolicy::CarryForward,
            mip_policy: DeltaPolicy::CarryForward,
            initial_delta: 1.0,
            min_leak_threshold: 0.1,
            indicator_threshold: 0.5,
            max_rounds: 25,
            min_improvement: 1e-6,
            mip_polish: true,
            warm_start: true,
            max_plausible_leak: 10.0,
            big_m_safety_factor: 10.0,
            big_m_retries: 1,
            leak_limit: None,
            round_budget_s: None,
        }
    }
}

impl RefinementConfig {
    pub fn validate(&self) -> LocateResult<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.initial_delta) {
            return Err(invalid("initial_delta must be positive"));
        }
        if !(self.min_leak_threshold.is_finite() && self.min_leak_threshold >= 0.0) {
            return Err(invalid("min_leak_threshold must be non-negative"));
        }
        if !(self.indicator_threshold.is_finite() && self.indicator_threshold >= 0.0) {
            return Err(invalid("indicator_threshold must be non-negative"));
        }
        if self.max_rounds == 0 {
            return Err(invalid("max_rounds must be at least 1"));
        }
        if !(self.min_improvement.is_finite() && self.min_improvement >= 0.0) {
            return Err(invalid("min_improvement must be non-negative"));
        }
        if !positive(self.max_plausible_leak) || !positive(self.big_m_safety_factor) {
            return Err(invalid("big-M scale factors must be positive"));
        }
        if self.leak_limit == Some(0) {
            return Err(invalid("leak_limit must be at least 1"));
        }
        Ok(())
    }
}

/// Single-leak probe settings.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Probe every `stride`-th node; unprobed nodes are not candidates
    pub stride: usize,
    /// Probe magnitudes below this are floored to it
    pub min_magnitude: f64,
    /// Run probes concurrently on cloned models
    pub parallel: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            stride: 1,
            min_magnitude: 1e-3,
            parallel: false,
        }
    }
}

impl ProbeConfig {
    pub fn validate(&self) -> LocateResult<()> {
        if self.stride == 0 {
            return Err(invalid("probe stride must be at least 1"));
        }
        if !(self.min_magnitude.is_finite() && self.min_magnitude > 0.0) {
            return Err(invalid("min probe magnitude must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub seed: u64,
    pub num_leaks: usize,
    pub min_leak_size: f64,
    pub max_leak_size: f64,
    /// Node labels never chosen as leaks or sensors
    pub ignore_nodes: Vec<String>,
    /// Share of eligible nodes instrumented with pressure sensors
    pub sensor_fraction: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_leaks: 2,
            min_leak_size: 1.0,
            max_leak_size: 10.0,
            ignore_nodes: Vec::new(),
            sensor_fraction: 1.0,
        }
    }
}

impl ScenarioConfig {
    pub fn validate(&self) -> LocateResult<()> {
        if !(self.min_leak_size.is_finite()
            && self.min_leak_size > 0.0
            && self.max_leak_size.is_finite()
            && self.min_leak_size < self.max_leak_size)
        {
            return Err(invalid("leak sizes must satisfy 0 < min < max"));
        }
        if !(self.sensor_fraction > 0.0 && self.sensor_fraction <= 1.0) {
            return Err(invalid("sensor_fraction must be in (0, 1]"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    pub iterations: usize,
    pub scenario: ScenarioConfig,
    pub windows: Vec<AnalysisWindow>,
    pub refinement: RefinementConfig,
    pub probe: ProbeConfig,
    pub near_optima: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            iterations: 1,
            scenario: ScenarioConfig::default(),
            windows: vec![AnalysisWindow::new(259_200.0, 4)],
            refinement: RefinementConfig::default(),
            probe: ProbeConfig::default(),
            near_optima: false,
        }
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> LocateResult<()> {
        if self.iterations == 0 {
            return Err(invalid("iterations must be at least 1"));
        }
        if self.windows.is_empty() || self.windows.iter().any(|w| w.points == 0) {
            return Err(invalid("at least one non-empty analysis window is required"));
        }
        self.scenario.validate()?;
        self.refinement.validate()?;
        self.probe.validate()
    }
}

fn invalid(what: &str) -> LocateError {
    LocateError::InvalidConfig {
        what: what.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ExperimentConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_rounds_rejected() {
        let cfg = RefinementConfig {
            max_rounds: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_leak_range_rejected() {
        let cfg = ScenarioConfig {
            min_leak_size: 5.0,
            max_leak_size: 1.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
