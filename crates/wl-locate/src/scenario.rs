//! Synthetic ground truth: random leaks and sensor placement.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::config::ScenarioConfig;
use crate::error::{LocateError, LocateResult};

/// Leaks injected for one outer iteration. Never shown to the optimizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeakScenario {
    pub nodes: Vec<usize>,
    /// Emitter coefficient per leak, same order as `nodes`
    pub magnitudes: Vec<f64>,
}

impl LeakScenario {
    pub fn new(nodes: Vec<usize>, magnitudes: Vec<f64>) -> LocateResult<Self> {
        if nodes.len() != magnitudes.len() {
            return Err(LocateError::DimensionMismatch {
                what: "leak magnitudes",
                expected: nodes.len(),
                actual: magnitudes.len(),
            });
        }
        let mut seen = nodes.clone();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != nodes.len() {
            return Err(LocateError::Scenario {
                what: "leak nodes must be distinct".to_string(),
            });
        }
        Ok(Self { nodes, magnitudes })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Dense length-`n` truth vector, zero away from the leaks.
    pub fn truth(&self, n: usize) -> Vec<f64> {
        let mut t = vec![0.0; n];
        for (&j, &m) in self.nodes.iter().zip(&self.magnitudes) {
            if j < n {
                t[j] = m;
            }
        }
        t
    }
}

/// Nodes where pressure is observed. Kept sorted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorSet {
    nodes: Vec<usize>,
    #[serde(skip)]
    mask: Vec<bool>,
}

impl SensorSet {
    pub fn all(n: usize) -> Self {
        Self {
            nodes: (0..n).collect(),
            mask: vec![true; n],
        }
    }

    pub fn from_nodes(n: usize, mut nodes: Vec<usize>) -> LocateResult<Self> {
        nodes.sort_unstable();
        nodes.dedup();
        if let Some(&bad) = nodes.iter().find(|&&i| i >= n) {
            return Err(LocateError::Scenario {
                what: format!("sensor node {bad} out of range (n={n})"),
            });
        }
        let mut mask = vec![false; n];
        for &i in &nodes {
            mask[i] = true;
        }
        Ok(Self { nodes, mask })
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    /// Row filter: true when node `i` carries a sensor.
    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn is_observed(&self, i: usize) -> bool {
        self.mask.get(i).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.mask.len()
    }
}

/// Seeded source of leak scenarios and sensor sets.
#[derive(Debug, Clone)]
pub struct ScenarioGenerator {
    rng: StdRng,
    config: ScenarioConfig,
}

impl ScenarioGenerator {
    pub fn new(config: ScenarioConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
        }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Indices whose label is not on the ignore-list.
    pub fn eligible(&self, labels: &[String]) -> Vec<usize> {
        labels
            .iter()
            .enumerate()
            .filter(|(_, l)| !self.config.ignore_nodes.contains(l))
            .map(|(i, _)| i)
            .collect()
    }

    /// Draw `num_leaks` distinct eligible nodes with magnitudes in `[min, max)`.
    pub fn next_leaks(&mut self, labels: &[String]) -> LocateResult<LeakScenario> {
        let eligible = self.eligible(labels);
        let k = self.config.num_leaks;
        if eligible.len() < k {
            return Err(LocateError::Scenario {
                what: format!(
                    "{k} leaks requested but only {} eligible nodes",
                    eligible.len()
                ),
            });
        }
        let nodes: Vec<usize> = eligible
            .choose_multiple(&mut self.rng, k)
            .copied()
            .collect();
        let magnitudes = nodes
            .iter()
            .map(|_| {
                self.rng
                    .gen_range(self.config.min_leak_size..self.config.max_leak_size)
            })
            .collect();
        LeakScenario::new(nodes, magnitudes)
    }

    /// Random sensor subset covering `sensor_fraction` of the eligible nodes.
    pub fn next_sensors(&mut self, labels: &[String]) -> LocateResult<SensorSet> {
        let eligible = self.eligible(labels);
        if eligible.is_empty() {
            return Err(LocateError::Scenario {
                what: "no eligible sensor nodes".to_string(),
            });
        }
        let count = ((self.config.sensor_fraction * eligible.len() as f64).ceil() as usize)
            .clamp(1, eligible.len());
        let nodes: Vec<usize> = if count == eligible.len() {
            eligible
        } else {
            eligible
                .choose_multiple(&mut self.rng, count)
                .copied()
                .collect()
        };
        SensorSet::from_nodes(labels.len(), nodes)
    }
}
