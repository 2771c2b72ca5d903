//! L1 fit as a linear program.
//!
//! `min Σ e` subject to `-e ≤ A x - b ≤ e`, written as the doubled system
//!
//! ```text
//! [  A  -I ] [x]    [  b ]
//! [ -A  -I ] [e] ≤  [ -b ]
//! ```
//!
//! MIP polishing appends binaries `z` with `x_j - M z_j ≤ 0` and `Σ z ≤ limit`.

use std::ops::Range;

use nalgebra::{DMatrix, DVector};
use wl_optim::{LinearProgram, Sense, VarKind};

use crate::error::{LocateResult, check_len};
use crate::scenario::SensorSet;

/// Build `Ahat` (2n×2n) and `bhat` (2n) from `A` (n×n) and `b` (n).
pub fn doubled_system(a: &DMatrix<f64>, b: &[f64]) -> (DMatrix<f64>, DVector<f64>) {
    let n = a.nrows();
    let mut ahat = DMatrix::<f64>::zeros(2 * n, 2 * n);
    ahat.view_mut((0, 0), (n, n)).copy_from(a);
    ahat.view_mut((n, 0), (n, n)).copy_from(&(-a));
    for i in 0..n {
        ahat[(i, n + i)] = -1.0;
        ahat[(n + i, n + i)] = -1.0;
    }
    let bhat = DVector::from_iterator(2 * n, b.iter().copied().chain(b.iter().map(|v| -v)));
    (ahat, bhat)
}

/// Where each block of variables lives in the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L1Layout {
    pub n: usize,
    pub z: Option<Range<usize>>,
}

impl L1Layout {
    pub fn x(&self) -> Range<usize> {
        0..self.n
    }

    pub fn e(&self) -> Range<usize> {
        self.n..2 * self.n
    }

    /// Leak-magnitude block of a solution vector.
    pub fn magnitudes<'a>(&self, solution: &'a [f64]) -> &'a [f64] {
        &solution[self.x()]
    }
}

/// Big-M scaled to the instance: the larger of the plausible leak bound and
/// the largest LP magnitude, times a safety factor.
pub fn scaled_big_m(max_plausible: f64, lp_magnitudes: &[f64], safety: f64) -> f64 {
    let largest = lp_magnitudes.iter().copied().fold(0.0, f64::max);
    max_plausible.max(largest) * safety
}

#[derive(Debug, Clone, Default)]
pub struct ConstraintAssembler;

impl ConstraintAssembler {
    pub fn new() -> Self {
        Self
    }

    /// The continuous L1 program.
    ///
    /// Only sensor rows are emitted. Non-candidate magnitudes are fixed at zero.
    pub fn lp(
        &self,
        a: &DMatrix<f64>,
        b: &[f64],
        sensors: &SensorSet,
        candidates: &[bool],
    ) -> LocateResult<(LinearProgram, L1Layout)> {
        let n = a.nrows();
        check_len("sensitivity columns", n, a.ncols())?;
        check_len("pressure residual", n, b.len())?;
        check_len("sensor mask", n, sensors.node_count())?;
        check_len("candidate mask", n, candidates.len())?;

        let mut lp = LinearProgram::new();
        for &candidate in candidates {
            let upper = if candidate { f64::INFINITY } else { 0.0 };
            lp.add_var(VarKind::Continuous, 0.0, upper, 0.0);
        }
        for _ in 0..n {
            lp.add_var(VarKind::Continuous, 0.0, f64::INFINITY, 1.0);
        }

        let (ahat, bhat) = doubled_system(a, b);
        for i in sensors.nodes() {
            for r in [*i, n + *i] {
                let coeffs = (0..2 * n).map(|j| (j, ahat[(r, j)])).collect();
                lp.add_row(coeffs, Sense::Le, bhat[r]);
            }
        }

        Ok((lp, L1Layout { n, z: None }))
    }

    /// The LP plus indicator binaries, big-M links and the cardinality cap.
    ///
    /// `warm_start` lists nodes whose indicator should start at 1.
    #[allow(clippy::too_many_arguments)]
    pub fn mip(
        &self,
        a: &DMatrix<f64>,
        b: &[f64],
        sensors: &SensorSet,
        candidates: &[bool],
        big_m: f64,
        limit: usize,
        warm_start: Option<&[usize]>,
    ) -> LocateResult<(LinearProgram, L1Layout)> {
        let (mut lp, layout) = self.lp(a, b, sensors, candidates)?;
        let n = layout.n;
        let z0 = lp.num_vars();
        for _ in 0..n {
            lp.add_var(VarKind::Binary, 0.0, 1.0, 0.0);
        }
        for j in 0..n {
            lp.add_row(vec![(j, 1.0), (z0 + j, -big_m)], Sense::Le, 0.0);
        }
        lp.add_row((z0..z0 + n).map(|z| (z, 1.0)).collect(), Sense::Le, limit as f64);

        if let Some(nodes) = warm_start {
            for j in 0..n {
                let on = if nodes.contains(&j) { 1.0 } else { 0.0 };
                lp.set_warm_start(z0 + j, on);
            }
        }

        Ok((
            lp,
            L1Layout {
                n,
                z: Some(z0..z0 + n),
            },
        ))
    }

    /// Pin every magnitude to `values` with equality rows, clamped to its bounds.
    pub fn pin(&self, lp: &mut LinearProgram, layout: &L1Layout, values: &[f64]) -> LocateResult<()> {
        check_len("pinned magnitudes", layout.n, values.len())?;
        for (j, v) in layout.x().zip(values) {
            let var = &lp.vars[j];
            let v = v.clamp(var.lower, var.upper);
            lp.add_row(vec![(j, 1.0)], Sense::Eq, v);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn a3() -> DMatrix<f64> {
        DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.5])
    }

    #[test]
    fn doubled_system_blocks() {
        let a = a3();
        let b = [1.0, -2.0, 3.0];
        let (ahat, bhat) = doubled_system(&a, &b);
        assert_eq!(ahat.shape(), (6, 6));
        assert_eq!(ahat.view((0, 0), (3, 3)), a);
        assert_eq!(ahat.view((3, 0), (3, 3)), -&a);
        let minus_i = -DMatrix::<f64>::identity(3, 3);
        assert_eq!(ahat.view((0, 3), (3, 3)), minus_i);
        assert_eq!(ahat.view((3, 3), (3, 3)), minus_i);
        assert_eq!(bhat.as_slice(), &[1.0, -2.0, 3.0, -1.0, 2.0, -3.0]);
    }

    #[test]
    fn lp_has_two_rows_per_sensor() {
        let sensors = SensorSet::from_nodes(3, vec![0, 2]).unwrap();
        let (lp, layout) = ConstraintAssembler::new()
            .lp(&a3(), &[1.0, 1.0, 1.0], &sensors, &[true, true, false])
            .unwrap();
        assert_eq!(lp.num_vars(), 6);
        assert_eq!(lp.num_rows(), 4);
        assert_eq!(layout.e(), 3..6);
        assert_eq!(lp.vars[2].upper, 0.0);
        assert!(lp.vars[3..].iter().all(|v| v.objective == 1.0));
        // Row for sensor 2 carries A's third row and -e_2.
        assert_eq!(lp.rows[2].coeffs, vec![(0, 7.0), (1, 8.0), (2, 9.5), (5, -1.0)]);
    }

    #[test]
    fn mip_adds_links_and_cardinality() {
        let sensors = SensorSet::all(3);
        let (lp, layout) = ConstraintAssembler::new()
            .mip(&a3(), &[0.0; 3], &sensors, &[true; 3], 100.0, 2, Some(&[1]))
            .unwrap();
        assert_eq!(lp.num_vars(), 9);
        assert_eq!(lp.num_binaries(), 3);
        assert_eq!(layout.z, Some(6..9));
        assert_eq!(lp.num_rows(), 6 + 3 + 1);
        assert_eq!(lp.rows[6].coeffs, vec![(0, 1.0), (6, -100.0)]);
        let card = lp.rows.last().unwrap();
        assert_eq!(card.rhs, 2.0);
        assert_eq!(card.coeffs.len(), 3);
        assert!(lp.warm_start.contains(&(7, 1.0)));
        assert!(lp.warm_start.contains(&(6, 0.0)));
    }

    #[test]
    fn big_m_tracks_instance_scale() {
        assert_eq!(scaled_big_m(10.0, &[3.0, 4.0], 10.0), 100.0);
        assert_eq!(scaled_big_m(10.0, &[30.0], 2.0), 60.0);
    }

    /// Square `A` with entries in [-50, 50] and a matching `b`.
    fn system() -> impl Strategy<Value = (DMatrix<f64>, Vec<f64>)> {
        (1usize..8).prop_flat_map(|n| {
            (
                prop::collection::vec(-50.0..50.0f64, n * n),
                prop::collection::vec(-50.0..50.0f64, n),
            )
                .prop_map(move |(a, b)| (DMatrix::from_row_slice(n, n, &a), b))
        })
    }

    proptest! {
        #[test]
        fn doubling_holds_for_any_system((a, b) in system()) {
            let n = a.nrows();
            let (ahat, bhat) = doubled_system(&a, &b);
            prop_assert_eq!(ahat.shape(), (2 * n, 2 * n));
            prop_assert_eq!(bhat.len(), 2 * n);
            let minus_i = -DMatrix::<f64>::identity(n, n);
            prop_assert_eq!(ahat.view((0, 0), (n, n)).into_owned(), a.clone());
            prop_assert_eq!(ahat.view((n, 0), (n, n)).into_owned(), -&a);
            prop_assert_eq!(ahat.view((0, n), (n, n)).into_owned(), minus_i.clone());
            prop_assert_eq!(ahat.view((n, n), (n, n)).into_owned(), minus_i);
            for i in 0..n {
                prop_assert_eq!(bhat[i], b[i]);
                prop_assert_eq!(bhat[n + i], -b[i]);
            }
        }
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let sensors = SensorSet::all(3);
        assert!(
            ConstraintAssembler::new()
                .lp(&a3(), &[1.0], &sensors, &[true; 3])
                .is_err()
        );
    }
}
