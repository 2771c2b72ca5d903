//! Finite-difference sensitivity of node pressures to single-node leaks.

use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::debug;
use wl_core::ensure_finite;
use wl_hydraulics::{AnalysisWindow, EmitterGuard, HydraulicError, HydraulicModel, NodeReadings};

use crate::config::ProbeConfig;
use crate::error::{LocateResult, check_len};
use crate::policy::floor_deltas;

/// Result of one probing pass.
#[derive(Debug, Clone)]
pub struct SensitivityPass {
    /// `A[i][j]`: pressure drop at node `i` per unit emitter at node `j`
    pub matrix: DMatrix<f64>,
    pub baseline: NodeReadings,
    /// Columns that were actually probed; the rest are zero
    pub probed: Vec<bool>,
    /// Magnitudes used, after flooring
    pub deltas: Vec<f64>,
    pub simulations: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SensitivityBuilder {
    config: ProbeConfig,
}

fn single(mut readings: Vec<NodeReadings>) -> LocateResult<NodeReadings> {
    readings.pop().ok_or_else(|| {
        HydraulicError::ProblemSetup {
            what: "simulation returned no readings".to_string(),
        }
        .into()
    })
}

impl SensitivityBuilder {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Nodes probed each pass: every `stride`-th index.
    pub fn probe_nodes(&self, n: usize) -> Vec<usize> {
        (0..n).step_by(self.config.stride.max(1)).collect()
    }

    /// Run the baseline, then one single-leak simulation per probed node.
    ///
    /// The model's emitters must be clear on entry and are clear on return.
    pub fn build<M>(
        &self,
        model: &mut M,
        window: &AnalysisWindow,
        deltas: &[f64],
    ) -> LocateResult<SensitivityPass>
    where
        M: HydraulicModel + Clone + Send + Sync,
    {
        let n = model.node_count();
        check_len("probe magnitudes", n, deltas.len())?;
        let mut deltas = deltas.to_vec();
        floor_deltas(&mut deltas, self.config.min_magnitude)?;

        let windows = [*window];
        let baseline = single(model.simulate(&windows)?)?;
        check_len("baseline readings", n, baseline.len())?;

        let nodes = self.probe_nodes(n);
        let columns: Vec<(usize, NodeReadings)> = if self.config.parallel {
            let shared: &M = model;
            nodes
                .par_iter()
                .map(|&j| -> LocateResult<(usize, NodeReadings)> {
                    let mut local = shared.clone();
                    local.set_emitter(j, deltas[j])?;
                    Ok((j, single(local.simulate(&windows)?)?))
                })
                .collect::<LocateResult<Vec<_>>>()?
        } else {
            let mut out = Vec::with_capacity(nodes.len());
            for &j in &nodes {
                let mut probe = EmitterGuard::set(model, j, deltas[j])?;
                out.push((j, single(probe.simulate(&windows)?)?));
            }
            out
        };

        let mut matrix = DMatrix::<f64>::zeros(n, n);
        let mut probed = vec![false; n];
        for (j, readings) in &columns {
            check_len("probe readings", n, readings.len())?;
            probed[*j] = true;
            for i in 0..n {
                let a = (baseline.pressure[i] - readings.pressure[i]) / deltas[*j];
                matrix[(i, *j)] = ensure_finite(a, "sensitivity entry")?;
            }
        }

        debug!(nodes = n, probes = columns.len(), "sensitivity matrix built");
        Ok(SensitivityPass {
            matrix,
            baseline,
            probed,
            deltas,
            simulations: 1 + columns.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wl_hydraulics::HydraulicResult;

    /// p_i = 50 - sum_j S_ij c_j with S = [[2, 1], [1, 3]].
    #[derive(Clone)]
    struct Linear {
        c: Vec<f64>,
        runs: usize,
    }

    impl HydraulicModel for Linear {
        fn node_count(&self) -> usize {
            2
        }
        fn node_label(&self, idx: usize) -> String {
            format!("N{idx}")
        }
        fn emitter(&self, idx: usize) -> HydraulicResult<f64> {
            Ok(self.c[idx])
        }
        fn set_emitter(&mut self, idx: usize, coeff: f64) -> HydraulicResult<()> {
            self.c[idx] = coeff;
            Ok(())
        }
        fn simulate(&mut self, windows: &[AnalysisWindow]) -> HydraulicResult<Vec<NodeReadings>> {
            self.runs += 1;
            let p = vec![
                50.0 - 2.0 * self.c[0] - self.c[1],
                50.0 - self.c[0] - 3.0 * self.c[1],
            ];
            Ok(windows
                .iter()
                .map(|_| NodeReadings {
                    pressure: p.clone(),
                    demand: self.c.clone(),
                })
                .collect())
        }
    }

    fn window() -> AnalysisWindow {
        AnalysisWindow::new(0.0, 1)
    }

    #[test]
    fn linear_model_recovers_its_matrix() {
        let mut m = Linear {
            c: vec![0.0; 2],
            runs: 0,
        };
        let pass = SensitivityBuilder::default()
            .build(&mut m, &window(), &[1.0, 4.0])
            .unwrap();
        assert!((pass.matrix[(0, 0)] - 2.0).abs() < 1e-12);
        assert!((pass.matrix[(0, 1)] - 1.0).abs() < 1e-12);
        assert!((pass.matrix[(1, 1)] - 3.0).abs() < 1e-12);
        assert_eq!(pass.simulations, 3);
        assert_eq!(m.c, vec![0.0, 0.0]);
    }

    #[test]
    fn parallel_matches_sequential() {
        let mut m = Linear {
            c: vec![0.0; 2],
            runs: 0,
        };
        let seq = SensitivityBuilder::default()
            .build(&mut m, &window(), &[1.0, 1.0])
            .unwrap();
        let par = SensitivityBuilder::new(ProbeConfig {
            parallel: true,
            ..Default::default()
        })
        .build(&mut m, &window(), &[1.0, 1.0])
        .unwrap();
        assert_eq!(seq.matrix, par.matrix);
    }

    #[test]
    fn zero_delta_is_floored_not_skipped() {
        let mut m = Linear {
            c: vec![0.0; 2],
            runs: 0,
        };
        let pass = SensitivityBuilder::default()
            .build(&mut m, &window(), &[0.0, 1.0])
            .unwrap();
        assert_eq!(pass.deltas[0], 1e-3);
        assert!((pass.matrix[(0, 0)] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn stride_leaves_unprobed_columns_zero() {
        let mut m = Linear {
            c: vec![0.0; 2],
            runs: 0,
        };
        let pass = SensitivityBuilder::new(ProbeConfig {
            stride: 2,
            ..Default::default()
        })
        .build(&mut m, &window(), &[1.0, 1.0])
        .unwrap();
        assert_eq!(pass.probed, vec![true, false]);
        assert_eq!(pass.matrix[(0, 1)], 0.0);
        assert_eq!(m.runs, 2);
    }
}
