//! The solver contract consumed by the localization core.

use tracing::warn;

use crate::error::OptimResult;
use crate::program::LinearProgram;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    InfeasibleOrUnbounded,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    /// Variable values; empty unless `status` is `Optimal`.
    pub x: Vec<f64>,
    pub objective: f64,
}

impl SolveOutcome {
    pub fn optimal(x: Vec<f64>, objective: f64) -> Self {
        Self {
            status: SolveStatus::Optimal,
            x,
            objective,
        }
    }

    pub fn failed(status: SolveStatus) -> Self {
        Self {
            status,
            x: Vec::new(),
            objective: f64::NAN,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }
}

/// Solves `LinearProgram`s.
///
/// Infeasible and unbounded programs are reported through `SolveStatus`,
/// not as errors. `Err` is reserved for malformed input and backend faults.
pub trait Solver {
    fn name(&self) -> &str;

    fn solve(&self, program: &LinearProgram) -> OptimResult<SolveOutcome>;
}

impl<S: Solver + ?Sized> Solver for &S {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&self, program: &LinearProgram) -> OptimResult<SolveOutcome> {
        (**self).solve(program)
    }
}

/// Retries transient backend failures a bounded number of times.
///
/// A `SolveStatus::Other` outcome counts as transient. Infeasibility does not.
#[derive(Debug, Clone)]
pub struct RetryingSolver<S> {
    inner: S,
    max_retries: usize,
}

impl<S: Solver> RetryingSolver<S> {
    pub fn new(inner: S, max_retries: usize) -> Self {
        Self { inner, max_retries }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Solver> Solver for RetryingSolver<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn solve(&self, program: &LinearProgram) -> OptimResult<SolveOutcome> {
        let mut attempt = 0;
        loop {
            match self.inner.solve(program) {
                Ok(out) if out.status == SolveStatus::Other && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(solver = self.name(), attempt, "solver returned no usable status, retrying");
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(solver = self.name(), attempt, error = %e, "solver backend failed, retrying");
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OptimError;
    use std::cell::Cell;

    struct Flaky {
        failures: Cell<usize>,
        calls: Cell<usize>,
    }

    impl Solver for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        fn solve(&self, _program: &LinearProgram) -> OptimResult<SolveOutcome> {
            self.calls.set(self.calls.get() + 1);
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(OptimError::Backend {
                    message: "transient".into(),
                });
            }
            Ok(SolveOutcome::optimal(vec![], 0.0))
        }
    }

    #[test]
    fn retries_until_success() {
        let s = RetryingSolver::new(
            Flaky {
                failures: Cell::new(2),
                calls: Cell::new(0),
            },
            3,
        );
        assert!(s.solve(&LinearProgram::new()).unwrap().is_optimal());
        assert_eq!(s.inner().calls.get(), 3);
    }

    #[test]
    fn gives_up_after_limit() {
        let s = RetryingSolver::new(
            Flaky {
                failures: Cell::new(5),
                calls: Cell::new(0),
            },
            1,
        );
        assert!(s.solve(&LinearProgram::new()).is_err());
        assert_eq!(s.inner().calls.get(), 2);
    }
}
