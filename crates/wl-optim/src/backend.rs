//! `good_lp` backend using the pure-Rust microlp engine.

use good_lp::solvers::microlp::microlp;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable as LpVar,
    constraint, variable,
};
use tracing::debug;

use crate::error::{OptimError, OptimResult};
use crate::program::{LinearProgram, Sense, VarKind};
use crate::solver::{SolveOutcome, SolveStatus, Solver};

/// Solves LPs and MIPs with microlp (branch and bound for binaries).
///
/// microlp has no MIP start support, so warm-start hints are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpSolver;

impl GoodLpSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Solver for GoodLpSolver {
    fn name(&self) -> &str {
        "microlp"
    }

    fn solve(&self, program: &LinearProgram) -> OptimResult<SolveOutcome> {
        program.validate()?;
        if program.vars.is_empty() {
            return Ok(SolveOutcome::optimal(Vec::new(), 0.0));
        }
        if !program.warm_start.is_empty() {
            debug!(
                hints = program.warm_start.len(),
                "backend has no warm-start support, hints ignored"
            );
        }

        let mut vars = ProblemVariables::new();
        let handles: Vec<LpVar> = program
            .vars
            .iter()
            .map(|v| {
                let mut def = variable();
                if v.kind == VarKind::Binary {
                    def = def.binary();
                }
                if v.lower.is_finite() {
                    def = def.min(v.lower);
                }
                if v.upper.is_finite() {
                    def = def.max(v.upper);
                }
                vars.add(def)
            })
            .collect();

        let mut objective = Expression::from(0.0);
        for (v, h) in program.vars.iter().zip(&handles) {
            if v.objective != 0.0 {
                objective += v.objective * *h;
            }
        }

        let mut model = vars.minimise(objective).using(microlp);
        for row in &program.rows {
            let mut lhs = Expression::from(0.0);
            for (j, a) in &row.coeffs {
                lhs += *a * handles[*j];
            }
            let rhs = row.rhs;
            model = match row.sense {
                Sense::Le => model.with(constraint!(lhs <= rhs)),
                Sense::Eq => model.with(constraint!(lhs == rhs)),
            };
        }

        match model.solve() {
            Ok(sol) => {
                let x: Vec<f64> = handles.iter().map(|h| sol.value(*h)).collect();
                let objective = program.objective_value(&x);
                debug!(
                    vars = program.num_vars(),
                    rows = program.num_rows(),
                    binaries = program.num_binaries(),
                    objective,
                    "program solved"
                );
                Ok(SolveOutcome::optimal(x, objective))
            }
            Err(ResolutionError::Infeasible) | Err(ResolutionError::Unbounded) => {
                Ok(SolveOutcome::failed(SolveStatus::InfeasibleOrUnbounded))
            }
            Err(e) => Err(OptimError::Backend {
                message: e.to_string(),
            }),
        }
    }
}
