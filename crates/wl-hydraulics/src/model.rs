//! The hydraulic collaborator seen by the localization core.

use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};
use wl_network::Network;

use crate::compile::HydraulicNetwork;
use crate::eps::{SimOptions, run_extended};
use crate::error::{HydraulicError, HydraulicResult};
use crate::window::{AnalysisWindow, NodeReadings, average_window};

/// A network whose junction emitters can be set and whose time-averaged
/// readings can be computed.
///
/// Junctions are addressed by contiguous index `0..node_count()`.
pub trait HydraulicModel {
    fn node_count(&self) -> usize;

    /// Human-readable junction id, used in reports.
    fn node_label(&self, idx: usize) -> String;

    fn emitter(&self, idx: usize) -> HydraulicResult<f64>;

    fn set_emitter(&mut self, idx: usize, coeff: f64) -> HydraulicResult<()>;

    /// Simulate with the current emitters and average readings over each window.
    fn simulate(&mut self, windows: &[AnalysisWindow]) -> HydraulicResult<Vec<NodeReadings>>;

    /// Number of simulations run so far.
    fn simulations_run(&self) -> usize {
        0
    }

    fn clear_emitters(&mut self) -> HydraulicResult<()> {
        for i in 0..self.node_count() {
            self.set_emitter(i, 0.0)?;
        }
        Ok(())
    }
}

/// Sets one emitter for the guard's lifetime and restores the previous
/// coefficient on drop.
pub struct EmitterGuard<'a, M: HydraulicModel + ?Sized> {
    model: &'a mut M,
    idx: usize,
    previous: f64,
}

impl<'a, M: HydraulicModel + ?Sized> EmitterGuard<'a, M> {
    pub fn set(model: &'a mut M, idx: usize, coeff: f64) -> HydraulicResult<Self> {
        let previous = model.emitter(idx)?;
        model.set_emitter(idx, coeff)?;
        Ok(Self {
            model,
            idx,
            previous,
        })
    }
}

impl<M: HydraulicModel + ?Sized> Deref for EmitterGuard<'_, M> {
    type Target = M;

    fn deref(&self) -> &M {
        self.model
    }
}

impl<M: HydraulicModel + ?Sized> DerefMut for EmitterGuard<'_, M> {
    fn deref_mut(&mut self) -> &mut M {
        self.model
    }
}

impl<M: HydraulicModel + ?Sized> Drop for EmitterGuard<'_, M> {
    fn drop(&mut self) {
        if let Err(e) = self.model.set_emitter(self.idx, self.previous) {
            warn!(node = self.idx, error = %e, "failed to restore emitter");
        }
    }
}

/// `HydraulicModel` backed by the built-in gradient-method engine.
#[derive(Debug, Clone)]
pub struct NetworkModel {
    net: HydraulicNetwork,
    emitters: Vec<f64>,
    options: SimOptions,
    /// Relaxed-tolerance attempts after a non-converged run
    max_retries: usize,
    simulations: usize,
}

impl NetworkModel {
    pub fn new(network: &Network) -> HydraulicResult<Self> {
        let net = HydraulicNetwork::compile(network)?;
        let emitters = net.base_emitters.clone();
        Ok(Self {
            net,
            emitters,
            options: SimOptions::default(),
            max_retries: 1,
            simulations: 0,
        })
    }

    pub fn with_options(mut self, options: SimOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn network(&self) -> &HydraulicNetwork {
        &self.net
    }

    pub fn emitters(&self) -> &[f64] {
        &self.emitters
    }

    fn check_index(&self, idx: usize) -> HydraulicResult<()> {
        if idx < self.emitters.len() {
            Ok(())
        } else {
            Err(HydraulicError::NodeOutOfRange {
                index: idx,
                len: self.emitters.len(),
            })
        }
    }
}

impl HydraulicModel for NetworkModel {
    fn node_count(&self) -> usize {
        self.net.junction_count()
    }

    fn node_label(&self, idx: usize) -> String {
        self.net
            .junction_names
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("#{idx}"))
    }

    fn emitter(&self, idx: usize) -> HydraulicResult<f64> {
        self.check_index(idx)?;
        Ok(self.emitters[idx])
    }

    fn set_emitter(&mut self, idx: usize, coeff: f64) -> HydraulicResult<()> {
        self.check_index(idx)?;
        if !(coeff.is_finite() && coeff >= 0.0) {
            return Err(HydraulicError::InvalidArg {
                what: "emitter coefficient must be finite and non-negative",
            });
        }
        self.emitters[idx] = coeff;
        Ok(())
    }

    fn simulate(&mut self, windows: &[AnalysisWindow]) -> HydraulicResult<Vec<NodeReadings>> {
        let step = self.net.times.hydraulic_step_s();
        let end_s = windows.iter().map(|w| w.end_s(step)).fold(0.0, f64::max);
        if end_s > self.net.times.duration_s() + 1e-9 {
            return Err(HydraulicError::ProblemSetup {
                what: format!(
                    "analysis ends at {end_s}s, beyond the {}s simulation duration",
                    self.net.times.duration_s()
                ),
            });
        }

        let mut options = self.options.clone();
        let mut attempt = 0;
        let record = loop {
            self.simulations += 1;
            match run_extended(&self.net, &self.emitters, end_s, &options) {
                Ok(record) => break record,
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(attempt, error = %e, "hydraulic run failed, retrying with relaxed tolerances");
                    options.gga = options.gga.relaxed();
                }
                Err(e) => return Err(e),
            }
        };
        debug!(end_s, windows = windows.len(), "hydraulic simulation complete");

        windows.iter().map(|w| average_window(&record, w)).collect()
    }

    fn simulations_run(&self) -> usize {
        self.simulations
    }
}
