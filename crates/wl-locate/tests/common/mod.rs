#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use wl_hydraulics::{AnalysisWindow, HydraulicError, HydraulicModel, HydraulicResult, NodeReadings};
use wl_optim::{LinearProgram, OptimResult, SolveOutcome, SolveStatus, Solver};

/// Pressures respond linearly to emitters: p_i = p0 - sum_j S_ij c_j.
#[derive(Debug, Clone)]
pub struct LinearModel {
    pub p0: f64,
    pub s: Vec<Vec<f64>>,
    pub emitters: Vec<f64>,
    pub runs: usize,
}

impl LinearModel {
    pub fn new(s: Vec<Vec<f64>>) -> Self {
        let n = s.len();
        Self {
            p0: 50.0,
            s,
            emitters: vec![0.0; n],
            runs: 0,
        }
    }

    /// S_ij = 1 / (1 + |i - j|)
    pub fn decaying(n: usize) -> Self {
        let s = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| 1.0 / (1.0 + (i as f64 - j as f64).abs()))
                    .collect()
            })
            .collect();
        Self::new(s)
    }
}

impl HydraulicModel for LinearModel {
    fn node_count(&self) -> usize {
        self.s.len()
    }

    fn node_label(&self, idx: usize) -> String {
        format!("J{idx}")
    }

    fn emitter(&self, idx: usize) -> HydraulicResult<f64> {
        self.emitters
            .get(idx)
            .copied()
            .ok_or(HydraulicError::NodeOutOfRange {
                index: idx,
                len: self.emitters.len(),
            })
    }

    fn set_emitter(&mut self, idx: usize, coeff: f64) -> HydraulicResult<()> {
        let len = self.emitters.len();
        let slot = self
            .emitters
            .get_mut(idx)
            .ok_or(HydraulicError::NodeOutOfRange { index: idx, len })?;
        *slot = coeff;
        Ok(())
    }

    fn simulate(&mut self, windows: &[AnalysisWindow]) -> HydraulicResult<Vec<NodeReadings>> {
        self.runs += 1;
        let pressure: Vec<f64> = self
            .s
            .iter()
            .map(|row| self.p0 - row.iter().zip(&self.emitters).map(|(s, c)| s * c).sum::<f64>())
            .collect();
        let demand: Vec<f64> = self.emitters.iter().map(|c| 1.0 + c).collect();
        Ok(windows
            .iter()
            .map(|_| NodeReadings {
                pressure: pressure.clone(),
                demand: demand.clone(),
            })
            .collect())
    }

    fn simulations_run(&self) -> usize {
        self.runs
    }
}

/// Replays a fixed sequence of outcomes, one per solve.
///
/// Every variable is set to `value`. Records the binary count of each
/// program it receives.
pub struct ScriptedSolver {
    script: RefCell<VecDeque<Option<f64>>>,
    pub value: f64,
    pub failure: SolveStatus,
    pub binaries: RefCell<Vec<usize>>,
}

impl ScriptedSolver {
    /// `None` entries produce a non-optimal status.
    pub fn new(objectives: &[Option<f64>]) -> Self {
        Self {
            script: RefCell::new(objectives.iter().copied().collect()),
            value: 1.0,
            failure: SolveStatus::Other,
            binaries: RefCell::new(Vec::new()),
        }
    }

    /// Status reported for `None` entries.
    pub fn failing_with(mut self, status: SolveStatus) -> Self {
        self.failure = status;
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.borrow().len()
    }
}

impl Solver for ScriptedSolver {
    fn name(&self) -> &str {
        "scripted"
    }

    fn solve(&self, program: &LinearProgram) -> OptimResult<SolveOutcome> {
        self.binaries.borrow_mut().push(program.num_binaries());
        match self.script.borrow_mut().pop_front() {
            Some(Some(objective)) => Ok(SolveOutcome::optimal(
                vec![self.value; program.num_vars()],
                objective,
            )),
            Some(None) => Ok(SolveOutcome::failed(self.failure)),
            None => Ok(SolveOutcome::failed(SolveStatus::Other)),
        }
    }
}

pub fn window() -> AnalysisWindow {
    AnalysisWindow::new(0.0, 1)
}

/// Pressure residual `S c` for the given true emitters.
pub fn residual(model: &LinearModel, truth: &[f64]) -> Vec<f64> {
    model
        .s
        .iter()
        .map(|row| row.iter().zip(truth).map(|(s, c)| s * c).sum())
        .collect()
}
