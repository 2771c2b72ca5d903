//! The refinement state machine.
//!
//! `Init → LpRound* → MipPolish* → Done`. Each phase starts from an
//! unbounded previous objective and keeps going while a round lowers the
//! objective by more than `min_improvement`, up to `max_rounds`. A round
//! that fails (non-converged hydraulics, solver fault, non-optimal status)
//! ends its phase and marks the window unreliable.

use serde::Serialize;
use tracing::{debug, info, warn};
use wl_core::Budget;
use wl_hydraulics::{AnalysisWindow, HydraulicModel};
use wl_optim::{SolveOutcome, SolveStatus, Solver};

use crate::assemble::{ConstraintAssembler, L1Layout, scaled_big_m};
use crate::config::{DeltaPolicy, ProbeConfig, RefinementConfig};
use crate::error::{LocateError, LocateResult, check_len};
use crate::event::LocateEvent;
use crate::policy::{leak_limit, next_deltas};
use crate::scenario::SensorSet;
use crate::sensitivity::{SensitivityBuilder, SensitivityPass};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Init,
    LpRound,
    MipPolish,
    Done,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::LpRound => "lp",
            Phase::MipPolish => "mip",
            Phase::Done => "done",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundRecord {
    pub phase: Phase,
    pub round: usize,
    pub objective: f64,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub big_m: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundFailure {
    pub phase: Phase,
    pub round: usize,
    pub reason: String,
}

/// Last accepted solution of a phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseSolution {
    /// Full solution vector: magnitudes, slacks, then indicators for MIP
    pub x: Vec<f64>,
    /// Leak magnitude per node, clamped at zero
    pub magnitudes: Vec<f64>,
    pub objective: f64,
    pub round: usize,
}

/// Everything the refinement mutates, owned in one place.
#[derive(Debug, Clone)]
pub struct IterationState {
    pub phase: Phase,
    pub deltas: Vec<f64>,
    pub previous_objective: f64,
    pub lp: Option<PhaseSolution>,
    pub mip: Option<PhaseSolution>,
    pub leak_limit: Option<usize>,
    pub rounds: Vec<RoundRecord>,
    pub failures: Vec<RoundFailure>,
    pub simulations: usize,
    pub budget_exhausted: bool,
}

impl IterationState {
    pub fn new(n: usize, initial_delta: f64) -> Self {
        Self {
            phase: Phase::Init,
            deltas: vec![initial_delta; n],
            previous_objective: f64::INFINITY,
            lp: None,
            mip: None,
            leak_limit: None,
            rounds: Vec::new(),
            failures: Vec::new(),
            simulations: 0,
            budget_exhausted: false,
        }
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = self.phase.label(), to = phase.label(), "phase transition");
        self.phase = phase;
        self.previous_objective = f64::INFINITY;
    }

    /// Strict improvement by more than `min_improvement`.
    pub fn improves(&self, objective: f64, min_improvement: f64) -> bool {
        objective.is_finite() && self.previous_objective - objective > min_improvement
    }

    /// Best available magnitudes: MIP if polished, else LP, else zeros.
    pub fn recovered(&self) -> Vec<f64> {
        self.mip
            .as_ref()
            .or(self.lp.as_ref())
            .map(|s| s.magnitudes.clone())
            .unwrap_or_else(|| vec![0.0; self.deltas.len()])
    }
}

/// Result of refining one analysis window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowOutcome {
    pub lp: Option<PhaseSolution>,
    pub mip: Option<PhaseSolution>,
    pub recovered: Vec<f64>,
    pub final_deltas: Vec<f64>,
    pub leak_limit: Option<usize>,
    pub rounds: Vec<RoundRecord>,
    pub failures: Vec<RoundFailure>,
    pub reliable: bool,
    pub budget_exhausted: bool,
    pub simulations: usize,
}

impl WindowOutcome {
    fn from_state(state: IterationState) -> Self {
        let recovered = state.recovered();
        let reliable = state.lp.is_some() && state.failures.is_empty();
        Self {
            lp: state.lp,
            mip: state.mip,
            recovered,
            final_deltas: state.deltas,
            leak_limit: state.leak_limit,
            rounds: state.rounds,
            failures: state.failures,
            reliable,
            budget_exhausted: state.budget_exhausted,
            simulations: state.simulations,
        }
    }

    pub fn lp_objective(&self) -> Option<f64> {
        self.lp.as_ref().map(|s| s.objective)
    }

    pub fn mip_objective(&self) -> Option<f64> {
        self.mip.as_ref().map(|s| s.objective)
    }
}

/// Identifies a window within an experiment, for logs and events.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundContext {
    pub iteration: usize,
    pub window: usize,
}

/// Inputs shared by every round of one window.
struct WindowInputs<'a> {
    window: &'a AnalysisWindow,
    residual: &'a [f64],
    sensors: &'a SensorSet,
    budget: &'a Budget,
    ctx: RoundContext,
}

/// Failures that end a phase instead of the experiment.
fn is_round_failure(e: &LocateError) -> bool {
    matches!(e, LocateError::Hydraulic(_) | LocateError::Optim(_))
}

/// Indices of the `k` largest positive entries.
fn largest(x: &[f64], k: usize) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..x.len()).filter(|&i| x[i] > 0.0).collect();
    idx.sort_by(|&a, &b| x[b].total_cmp(&x[a]).then(a.cmp(&b)));
    idx.truncate(k);
    idx
}

#[derive(Debug, Clone, Default)]
pub struct IterationController {
    refinement: RefinementConfig,
    builder: SensitivityBuilder,
    assembler: ConstraintAssembler,
}

impl IterationController {
    pub fn new(refinement: RefinementConfig, probe: ProbeConfig) -> Self {
        Self {
            refinement,
            builder: SensitivityBuilder::new(probe),
            assembler: ConstraintAssembler::new(),
        }
    }

    pub fn refinement(&self) -> &RefinementConfig {
        &self.refinement
    }

    pub fn builder(&self) -> &SensitivityBuilder {
        &self.builder
    }

    pub fn assembler(&self) -> &ConstraintAssembler {
        &self.assembler
    }

    /// Refine leak estimates for one window from its pressure residual.
    ///
    /// `residual[i]` is baseline minus observed pressure at node `i`.
    #[allow(clippy::too_many_arguments)]
    pub fn run_window<M, S>(
        &self,
        model: &mut M,
        solver: &S,
        window: &AnalysisWindow,
        residual: &[f64],
        sensors: &SensorSet,
        budget: &Budget,
        ctx: RoundContext,
        observer: &mut dyn FnMut(LocateEvent),
    ) -> LocateResult<WindowOutcome>
    where
        M: HydraulicModel + Clone + Send + Sync,
        S: Solver + ?Sized,
    {
        let n = model.node_count();
        check_len("pressure residual", n, residual.len())?;
        check_len("sensor mask", n, sensors.node_count())?;
        self.refinement.validate()?;
        self.builder.config().validate()?;

        let inputs = WindowInputs {
            window,
            residual,
            sensors,
            budget,
            ctx,
        };
        let mut state = IterationState::new(n, self.refinement.initial_delta);

        state.enter(Phase::LpRound);
        self.run_phase(&mut state, model, solver, &inputs, observer)?;

        match &state.lp {
            Some(lp) if self.refinement.mip_polish && !state.budget_exhausted => {
                let limit = self.refinement.leak_limit.unwrap_or_else(|| {
                    leak_limit(&lp.magnitudes, self.refinement.indicator_threshold).max(1)
                });
                state.leak_limit = Some(limit);
                state.enter(Phase::MipPolish);
                self.run_phase(&mut state, model, solver, &inputs, observer)?;
            }
            Some(_) => {}
            None => warn!(
                iteration = ctx.iteration,
                window = ctx.window,
                "no LP round accepted, skipping MIP polish"
            ),
        }
        state.enter(Phase::Done);

        let outcome = WindowOutcome::from_state(state);
        info!(
            iteration = ctx.iteration,
            window = ctx.window,
            lp_objective = outcome.lp_objective(),
            mip_objective = outcome.mip_objective(),
            rounds = outcome.rounds.len(),
            reliable = outcome.reliable,
            "window refined"
        );
        Ok(outcome)
    }

    fn run_phase<M, S>(
        &self,
        state: &mut IterationState,
        model: &mut M,
        solver: &S,
        inputs: &WindowInputs<'_>,
        observer: &mut dyn FnMut(LocateEvent),
    ) -> LocateResult<()>
    where
        M: HydraulicModel + Clone + Send + Sync,
        S: Solver + ?Sized,
    {
        let phase = state.phase;
        let cfg = &self.refinement;
        let policy = phase_policy(cfg, phase);
        let ctx = inputs.ctx;

        for round in 0..cfg.max_rounds {
            if inputs.budget.is_exhausted() {
                warn!(
                    iteration = ctx.iteration,
                    window = ctx.window,
                    phase = phase.label(),
                    round,
                    "time budget exhausted"
                );
                state.budget_exhausted = true;
                return Ok(());
            }

            let attempt = self
                .builder
                .build(model, inputs.window, &state.deltas)
                .and_then(|pass| {
                    state.simulations += pass.simulations;
                    self.solve_round(state, solver, &pass, inputs)
                });
            let (outcome, layout, big_m) = match attempt {
                Ok(v) => v,
                Err(e) if is_round_failure(&e) => {
                    self.fail(state, round, e.to_string(), ctx, observer);
                    return Ok(());
                }
                Err(e) => return Err(e),
            };
            if !outcome.is_optimal() {
                let reason = format!("solver status {:?}", outcome.status);
                self.fail(state, round, reason, ctx, observer);
                return Ok(());
            }

            let objective = outcome.objective;
            let accepted = state.improves(objective, cfg.min_improvement);
            state.rounds.push(RoundRecord {
                phase,
                round,
                objective,
                accepted,
                big_m,
            });
            observer(LocateEvent::Round {
                iteration: ctx.iteration,
                window: ctx.window,
                phase,
                round,
                objective,
                accepted,
            });
            debug!(
                iteration = ctx.iteration,
                window = ctx.window,
                phase = phase.label(),
                round,
                objective,
                previous = state.previous_objective,
                accepted,
                "round solved"
            );
            if !accepted {
                return Ok(());
            }

            state.previous_objective = objective;
            let magnitudes: Vec<f64> = layout
                .magnitudes(&outcome.x)
                .iter()
                .map(|v| v.max(0.0))
                .collect();
            let k = state.leak_limit.or(cfg.leak_limit).unwrap_or_else(|| {
                leak_limit(&magnitudes, cfg.indicator_threshold).max(1)
            });
            state.deltas = next_deltas(policy, &magnitudes, k, cfg);
            let solution = PhaseSolution {
                x: outcome.x,
                magnitudes,
                objective,
                round,
            };
            match phase {
                Phase::MipPolish => state.mip = Some(solution),
                _ => state.lp = Some(solution),
            }
        }

        debug!(phase = phase.label(), max_rounds = cfg.max_rounds, "round cap reached");
        Ok(())
    }

    fn solve_round<S: Solver + ?Sized>(
        &self,
        state: &IterationState,
        solver: &S,
        pass: &SensitivityPass,
        inputs: &WindowInputs<'_>,
    ) -> LocateResult<(SolveOutcome, L1Layout, Option<f64>)> {
        let cfg = &self.refinement;
        if state.phase != Phase::MipPolish {
            let (program, layout) =
                self.assembler
                    .lp(&pass.matrix, inputs.residual, inputs.sensors, &pass.probed)?;
            return Ok((solver.solve(&program)?, layout, None));
        }

        let limit = state.leak_limit.unwrap_or(1);
        let lp_magnitudes = state
            .lp
            .as_ref()
            .map(|s| s.magnitudes.as_slice())
            .unwrap_or(&[]);
        let mut big_m = scaled_big_m(
            cfg.max_plausible_leak,
            lp_magnitudes,
            cfg.big_m_safety_factor,
        );
        let hint = if cfg.warm_start {
            state
                .mip
                .as_ref()
                .or(state.lp.as_ref())
                .map(|s| largest(&s.magnitudes, limit))
        } else {
            None
        };

        let mut retries = 0;
        loop {
            let (program, layout) = self.assembler.mip(
                &pass.matrix,
                inputs.residual,
                inputs.sensors,
                &pass.probed,
                big_m,
                limit,
                hint.as_deref(),
            )?;
            let outcome = solver.solve(&program)?;
            if outcome.status == SolveStatus::InfeasibleOrUnbounded && retries < cfg.big_m_retries {
                retries += 1;
                warn!(big_m, retries, "MIP infeasible, retrying with larger big-M");
                big_m *= 10.0;
                continue;
            }
            return Ok((outcome, layout, Some(big_m)));
        }
    }

    fn fail(
        &self,
        state: &mut IterationState,
        round: usize,
        reason: String,
        ctx: RoundContext,
        observer: &mut dyn FnMut(LocateEvent),
    ) {
        warn!(
            iteration = ctx.iteration,
            window = ctx.window,
            phase = state.phase.label(),
            round,
            reason = %reason,
            "round failed, ending phase"
        );
        observer(LocateEvent::RoundFailed {
            iteration: ctx.iteration,
            window: ctx.window,
            phase: state.phase,
            round,
            reason: reason.clone(),
        });
        state.failures.push(RoundFailure {
            phase: state.phase,
            round,
            reason,
        });
    }
}

/// Policy lookup kept public for reports.
pub fn phase_policy(cfg: &RefinementConfig, phase: Phase) -> DeltaPolicy {
    match phase {
        Phase::MipPolish => cfg.mip_policy,
        _ => cfg.lp_policy,
    }
}
