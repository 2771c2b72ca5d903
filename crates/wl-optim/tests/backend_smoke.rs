//! Small LPs and MIPs solved end to end through the microlp backend.

use wl_optim::{GoodLpSolver, LinearProgram, Sense, SolveStatus, Solver, VarKind};

const INF: f64 = f64::INFINITY;

#[test]
fn l1_fit_of_a_single_value() {
    // min e  s.t.  x - e <= 3,  -x - e <= -3
    let mut lp = LinearProgram::new();
    let x = lp.add_var(VarKind::Continuous, 0.0, INF, 0.0);
    let e = lp.add_var(VarKind::Continuous, 0.0, INF, 1.0);
    lp.add_row(vec![(x, 1.0), (e, -1.0)], Sense::Le, 3.0);
    lp.add_row(vec![(x, -1.0), (e, -1.0)], Sense::Le, -3.0);

    let out = GoodLpSolver::new().solve(&lp).unwrap();
    assert_eq!(out.status, SolveStatus::Optimal);
    assert!((out.x[x] - 3.0).abs() < 1e-6);
    assert!(out.objective.abs() < 1e-6);
}

#[test]
fn infeasible_program_reports_status() {
    let mut lp = LinearProgram::new();
    let x = lp.add_var(VarKind::Continuous, 0.0, INF, 1.0);
    lp.add_row(vec![(x, 1.0)], Sense::Le, -1.0);

    let out = GoodLpSolver::new().solve(&lp).unwrap();
    assert_eq!(out.status, SolveStatus::InfeasibleOrUnbounded);
    assert!(out.x.is_empty());
}

#[test]
fn cardinality_limit_on_binaries() {
    // max x1 + x2 + x3 (as min of negation) with x_j <= 5 z_j and z1+z2+z3 <= 1
    let mut lp = LinearProgram::new();
    let xs: Vec<usize> = (0..3)
        .map(|k| lp.add_var(VarKind::Continuous, 0.0, INF, -(1.0 + k as f64)))
        .collect();
    let zs: Vec<usize> = (0..3)
        .map(|_| lp.add_var(VarKind::Binary, 0.0, 1.0, 0.0))
        .collect();
    for (x, z) in xs.iter().zip(&zs) {
        lp.add_row(vec![(*x, 1.0), (*z, -5.0)], Sense::Le, 0.0);
    }
    lp.add_row(zs.iter().map(|z| (*z, 1.0)).collect(), Sense::Le, 1.0);

    let out = GoodLpSolver::new().solve(&lp).unwrap();
    assert!(out.is_optimal());
    let z_sum: f64 = zs.iter().map(|z| out.x[*z]).sum();
    assert!(z_sum <= 1.0 + 1e-6);
    assert!((out.x[xs[2]] - 5.0).abs() < 1e-6);
    assert!((out.objective + 15.0).abs() < 1e-6);
}

#[test]
fn equality_rows_pin_values() {
    let mut lp = LinearProgram::new();
    let x = lp.add_var(VarKind::Continuous, 0.0, INF, -1.0);
    lp.add_row(vec![(x, 1.0)], Sense::Eq, 2.5);
    lp.set_warm_start(x, 2.0);

    let out = GoodLpSolver::new().solve(&lp).unwrap();
    assert!((out.x[x] - 2.5).abs() < 1e-9);
}
