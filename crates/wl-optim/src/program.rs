//! Solver-neutral linear program: `min cᵀx` subject to rows `a·x (≤|=) b`
//! and per-variable bounds, with optional binary variables.

use crate::error::{OptimError, OptimResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Continuous,
    Binary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub kind: VarKind,
    pub lower: f64,
    /// May be `f64::INFINITY`.
    pub upper: f64,
    pub objective: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Le,
    Eq,
}

/// One sparse constraint row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub coeffs: Vec<(usize, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

impl Row {
    pub fn activity(&self, x: &[f64]) -> f64 {
        self.coeffs
            .iter()
            .map(|(j, a)| a * x.get(*j).copied().unwrap_or(0.0))
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearProgram {
    pub vars: Vec<Variable>,
    pub rows: Vec<Row>,
    /// Suggested starting values; backends without start support ignore them.
    pub warm_start: Vec<(usize, f64)>,
}

impl LinearProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_var(&mut self, kind: VarKind, lower: f64, upper: f64, objective: f64) -> usize {
        let (lower, upper) = match kind {
            VarKind::Binary => (lower.max(0.0), upper.min(1.0)),
            VarKind::Continuous => (lower, upper),
        };
        self.vars.push(Variable {
            kind,
            lower,
            upper,
            objective,
        });
        self.vars.len() - 1
    }

    /// Add a row, dropping explicit zero coefficients.
    pub fn add_row(&mut self, coeffs: Vec<(usize, f64)>, sense: Sense, rhs: f64) -> usize {
        let coeffs = coeffs.into_iter().filter(|(_, a)| *a != 0.0).collect();
        self.rows.push(Row { coeffs, sense, rhs });
        self.rows.len() - 1
    }

    pub fn set_warm_start(&mut self, var: usize, value: f64) {
        self.warm_start.push((var, value));
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_binaries(&self) -> usize {
        self.vars
            .iter()
            .filter(|v| v.kind == VarKind::Binary)
            .count()
    }

    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.vars
            .iter()
            .zip(x)
            .map(|(v, xi)| v.objective * xi)
            .sum()
    }

    /// Structural checks before handing the program to a backend.
    pub fn validate(&self) -> OptimResult<()> {
        for (j, v) in self.vars.iter().enumerate() {
            if !v.objective.is_finite() || v.lower.is_nan() || v.upper.is_nan() {
                return Err(OptimError::InvalidProgram {
                    what: format!("variable {j} has non-finite data"),
                });
            }
            if v.lower > v.upper {
                return Err(OptimError::InvalidProgram {
                    what: format!("variable {j} has lower {} > upper {}", v.lower, v.upper),
                });
            }
        }
        for (i, row) in self.rows.iter().enumerate() {
            if !row.rhs.is_finite() {
                return Err(OptimError::InvalidProgram {
                    what: format!("row {i} has non-finite rhs"),
                });
            }
            for (j, a) in &row.coeffs {
                if *j >= self.vars.len() || !a.is_finite() {
                    return Err(OptimError::InvalidProgram {
                        what: format!("row {i} has bad coefficient for variable {j}"),
                    });
                }
            }
        }
        for (j, _) in &self.warm_start {
            if *j >= self.vars.len() {
                return Err(OptimError::InvalidProgram {
                    what: format!("warm start refers to unknown variable {j}"),
                });
            }
        }
        Ok(())
    }

    /// Largest violation of any row or bound at `x`.
    pub fn max_violation(&self, x: &[f64]) -> f64 {
        let mut worst: f64 = 0.0;
        for row in &self.rows {
            let act = row.activity(x);
            let v = match row.sense {
                Sense::Le => (act - row.rhs).max(0.0),
                Sense::Eq => (act - row.rhs).abs(),
            };
            worst = worst.max(v);
        }
        for (v, xi) in self.vars.iter().zip(x) {
            worst = worst.max(v.lower - xi).max(xi - v.upper);
        }
        worst
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_bounds_are_clamped() {
        let mut lp = LinearProgram::new();
        let z = lp.add_var(VarKind::Binary, -3.0, 7.0, 0.0);
        assert_eq!(lp.vars[z].lower, 0.0);
        assert_eq!(lp.vars[z].upper, 1.0);
        assert_eq!(lp.num_binaries(), 1);
    }

    #[test]
    fn zero_coefficients_dropped() {
        let mut lp = LinearProgram::new();
        let a = lp.add_var(VarKind::Continuous, 0.0, f64::INFINITY, 1.0);
        let b = lp.add_var(VarKind::Continuous, 0.0, f64::INFINITY, 1.0);
        lp.add_row(vec![(a, 1.0), (b, 0.0)], Sense::Le, 3.0);
        assert_eq!(lp.rows[0].coeffs, vec![(a, 1.0)]);
    }

    #[test]
    fn validate_rejects_unknown_variable() {
        let mut lp = LinearProgram::new();
        lp.add_var(VarKind::Continuous, 0.0, 1.0, 1.0);
        lp.add_row(vec![(5, 1.0)], Sense::Le, 1.0);
        assert!(lp.validate().is_err());
    }

    #[test]
    fn violation_measures_rows_and_bounds() {
        let mut lp = LinearProgram::new();
        let a = lp.add_var(VarKind::Continuous, 0.0, 2.0, 1.0);
        lp.add_row(vec![(a, 1.0)], Sense::Eq, 1.0);
        assert_eq!(lp.max_violation(&[1.0]), 0.0);
        assert_eq!(lp.max_violation(&[3.0]), 2.0);
        assert_eq!(lp.objective_value(&[3.0]), 3.0);
    }
}
