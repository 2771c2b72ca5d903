//! Re-costing each window's MIP solution against every other window.
//!
//! Cell `[l][m]` is the MIP objective for window `m` with the magnitudes
//! pinned to window `l`'s solution. The diagonal reproduces each window's
//! own optimum; off-diagonal cells show how well one solution explains
//! another window's residual.

use serde::Serialize;
use tracing::{debug, warn};
use wl_hydraulics::{AnalysisWindow, HydraulicModel};
use wl_optim::Solver;

use crate::assemble::scaled_big_m;
use crate::config::DeltaPolicy;
use crate::controller::{IterationController, PhaseSolution, RoundContext};
use crate::error::{LocateError, LocateResult, check_len};
use crate::event::LocateEvent;
use crate::policy::next_deltas;
use crate::scenario::SensorSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearOptimaTable {
    /// `None` where the source window had no MIP solution or the pinned
    /// program failed to solve.
    pub objectives: Vec<Vec<Option<f64>>>,
}

impl NearOptimaTable {
    pub fn len(&self) -> usize {
        self.objectives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objectives.is_empty()
    }

    pub fn get(&self, solution_window: usize, cost_window: usize) -> Option<f64> {
        self.objectives
            .get(solution_window)
            .and_then(|row| row.get(cost_window))
            .copied()
            .flatten()
    }
}

/// Build the cross-window cost table.
///
/// `solutions[l]` is window `l`'s MIP solution, `residuals[m]` the pressure
/// residual of window `m`.
#[allow(clippy::too_many_arguments)]
pub fn near_optima_table<M, S>(
    controller: &IterationController,
    model: &mut M,
    solver: &S,
    windows: &[AnalysisWindow],
    residuals: &[Vec<f64>],
    solutions: &[Option<&PhaseSolution>],
    sensors: &SensorSet,
    ctx: RoundContext,
    observer: &mut dyn FnMut(LocateEvent),
) -> LocateResult<NearOptimaTable>
where
    M: HydraulicModel + Clone + Send + Sync,
    S: Solver + ?Sized,
{
    let w = windows.len();
    check_len("window residuals", w, residuals.len())?;
    check_len("window solutions", w, solutions.len())?;
    let cfg = controller.refinement();
    let mut objectives = vec![vec![None; w]; w];

    for (l, solution) in solutions.iter().enumerate() {
        let Some(solution) = solution else {
            debug!(window = l, "no MIP solution to re-cost");
            continue;
        };
        let deltas = next_deltas(DeltaPolicy::CarryForward, &solution.magnitudes, 1, cfg);
        let limit = solution.magnitudes.iter().filter(|&&v| v > 0.0).count().max(1);
        let big_m = scaled_big_m(
            cfg.max_plausible_leak,
            &solution.magnitudes,
            cfg.big_m_safety_factor,
        );

        for (m, window) in windows.iter().enumerate() {
            observer(LocateEvent::NearOptima {
                iteration: ctx.iteration,
                solution_window: l,
                cost_window: m,
            });
            let cell = recost(
                controller,
                model,
                solver,
                window,
                &residuals[m],
                sensors,
                &solution.magnitudes,
                &deltas,
                big_m,
                limit,
            );
            objectives[l][m] = match cell {
                Ok(v) => v,
                Err(e @ (LocateError::Hydraulic(_) | LocateError::Optim(_))) => {
                    warn!(solution_window = l, cost_window = m, error = %e, "re-costing failed");
                    None
                }
                Err(e) => return Err(e),
            };
        }
    }

    Ok(NearOptimaTable { objectives })
}

#[allow(clippy::too_many_arguments)]
fn recost<M, S>(
    controller: &IterationController,
    model: &mut M,
    solver: &S,
    window: &AnalysisWindow,
    residual: &[f64],
    sensors: &SensorSet,
    magnitudes: &[f64],
    deltas: &[f64],
    big_m: f64,
    limit: usize,
) -> LocateResult<Option<f64>>
where
    M: HydraulicModel + Clone + Send + Sync,
    S: Solver + ?Sized,
{
    let pass = controller.builder().build(model, window, deltas)?;
    let (mut program, layout) = controller.assembler().mip(
        &pass.matrix,
        residual,
        sensors,
        &pass.probed,
        big_m,
        limit,
        None,
    )?;
    controller.assembler().pin(&mut program, &layout, magnitudes)?;
    let outcome = solver.solve(&program)?;
    Ok(outcome.is_optimal().then_some(outcome.objective))
}
