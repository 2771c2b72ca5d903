//! Gradient-method (Todini-Pilati) steady snapshot solver.
//!
//! Unknowns are junction heads and link flows. Each Newton step linearizes
//! every head-loss law around the current flow, solves the symmetric
//! positive-definite head system, then updates flows from the new heads.
//! Emitters are treated as pseudo-links from a junction to a fixed head
//! equal to its elevation.

use nalgebra::{DMatrix, DVector};

use crate::compile::{HydraulicNetwork, LinkEnd};
use crate::error::{HydraulicError, HydraulicResult};
use crate::headloss::{emitter, emitter_resistance, hazen_williams};

/// Gradient-method configuration.
#[derive(Debug, Clone)]
pub struct GgaConfig {
    /// Maximum Newton iterations per snapshot
    pub max_iterations: usize,
    /// Convergence threshold on Σ|ΔQ| / Σ|Q|
    pub accuracy: f64,
}

impl Default for GgaConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            accuracy: 1e-9,
        }
    }
}

impl GgaConfig {
    /// Looser settings used when a snapshot fails to converge.
    pub fn relaxed(&self) -> Self {
        Self {
            max_iterations: self.max_iterations * 2,
            accuracy: self.accuracy * 10.0,
        }
    }
}

/// Boundary conditions for one snapshot.
#[derive(Debug, Clone, Copy)]
pub struct SteadyInput<'a> {
    /// Junction demands, m³/s.
    pub demands: &'a [f64],
    /// Heads of reservoirs and tanks, m.
    pub fixed_heads: &'a [f64],
    /// Junction emitter coefficients, (L/s)/m^0.5.
    pub emitters: &'a [f64],
}

#[derive(Debug, Clone)]
pub struct SteadySolution {
    /// Junction heads, m.
    pub heads: Vec<f64>,
    /// Link flows, m³/s, positive from `from` to `to`.
    pub flows: Vec<f64>,
    /// Emitter outflow per junction, m³/s.
    pub emitter_flows: Vec<f64>,
    pub iterations: usize,
}

impl SteadySolution {
    /// Pressure head (head minus elevation) per junction.
    pub fn pressures(&self, net: &HydraulicNetwork) -> Vec<f64> {
        self.heads
            .iter()
            .zip(&net.elevations)
            .map(|(h, z)| h - z)
            .collect()
    }
}

fn end_head(end: LinkEnd, heads: &DVector<f64>, fixed_heads: &[f64]) -> f64 {
    match end {
        LinkEnd::Junction(i) => heads[i],
        LinkEnd::Fixed(k) => fixed_heads[k],
    }
}

/// Solve one hydraulic snapshot.
///
/// `warm` seeds flows from a previous solution (e.g. the prior time step).
pub fn solve_steady(
    net: &HydraulicNetwork,
    input: SteadyInput<'_>,
    warm: Option<&SteadySolution>,
    config: &GgaConfig,
    time_s: f64,
) -> HydraulicResult<SteadySolution> {
    let n = net.junction_count();
    if input.demands.len() != n || input.emitters.len() != n {
        return Err(HydraulicError::ProblemSetup {
            what: format!(
                "expected {n} demands and emitters, got {} and {}",
                input.demands.len(),
                input.emitters.len()
            ),
        });
    }
    if input.fixed_heads.len() != net.fixed.len() {
        return Err(HydraulicError::ProblemSetup {
            what: "fixed head count does not match network".to_string(),
        });
    }

    let emitter_r: Vec<Option<f64>> = input.emitters.iter().map(|c| emitter_resistance(*c)).collect();

    let mut q: Vec<f64> = match warm {
        Some(w) if w.flows.len() == net.links.len() => w.flows.clone(),
        _ => net.links.iter().map(|l| l.init_flow).collect(),
    };
    let mut qe: Vec<f64> = (0..n)
        .map(|i| match (emitter_r[i], warm) {
            (None, _) => 0.0,
            (Some(_), Some(w)) if w.emitter_flows.len() == n && w.emitter_flows[i] > 0.0 => {
                w.emitter_flows[i]
            }
            // One metre of pressure.
            (Some(_), _) => input.emitters[i] / 1000.0,
        })
        .collect();

    let mut lin = vec![(0.0, 0.0); net.links.len()];
    let mut lin_e = vec![(0.0, 0.0); n];

    for iter in 0..config.max_iterations {
        let mut a = DMatrix::<f64>::zeros(n, n);
        let mut f = DVector::<f64>::from_iterator(n, input.demands.iter().map(|d| -d));

        for (k, link) in net.links.iter().enumerate() {
            let hl = hazen_williams(link.resistance, q[k]);
            let p = 1.0 / hl.g;
            let y = p * hl.h;
            lin[k] = (p, y);
            let carry = q[k] - y;

            if let LinkEnd::Junction(i) = link.from {
                a[(i, i)] += p;
                f[i] -= carry;
            }
            if let LinkEnd::Junction(j) = link.to {
                a[(j, j)] += p;
                f[j] += carry;
            }
            match (link.from, link.to) {
                (LinkEnd::Junction(i), LinkEnd::Junction(j)) => {
                    a[(i, j)] -= p;
                    a[(j, i)] -= p;
                }
                (LinkEnd::Junction(i), LinkEnd::Fixed(k)) => f[i] += p * input.fixed_heads[k],
                (LinkEnd::Fixed(k), LinkEnd::Junction(j)) => f[j] += p * input.fixed_heads[k],
                (LinkEnd::Fixed(_), LinkEnd::Fixed(_)) => {}
            }
        }

        for i in 0..n {
            if let Some(r) = emitter_r[i] {
                let hl = emitter(r, qe[i]);
                let p = 1.0 / hl.g;
                let y = p * hl.h;
                lin_e[i] = (p, y);
                a[(i, i)] += p;
                f[i] += p * net.elevations[i] - (qe[i] - y);
            }
        }

        let heads = match a.clone().cholesky() {
            Some(chol) => chol.solve(&f),
            None => a.lu().solve(&f).ok_or_else(|| HydraulicError::Numeric {
                what: format!("singular head matrix at t={time_s}s"),
            })?,
        };
        if heads.iter().any(|h| !h.is_finite()) {
            return Err(HydraulicError::Numeric {
                what: format!("non-finite head at t={time_s}s"),
            });
        }

        let mut d_sum = 0.0;
        let mut q_sum = 0.0;
        for (k, link) in net.links.iter().enumerate() {
            let (p, y) = lin[k];
            let dh = end_head(link.from, &heads, input.fixed_heads)
                - end_head(link.to, &heads, input.fixed_heads);
            let q_new = q[k] - y + p * dh;
            d_sum += (q_new - q[k]).abs();
            q_sum += q_new.abs();
            q[k] = q_new;
        }
        for i in 0..n {
            if emitter_r[i].is_some() {
                let (p, y) = lin_e[i];
                let q_new = qe[i] - y + p * (heads[i] - net.elevations[i]);
                d_sum += (q_new - qe[i]).abs();
                q_sum += q_new.abs();
                qe[i] = q_new;
            }
        }

        if d_sum <= config.accuracy * q_sum || d_sum < 1e-15 {
            return Ok(SteadySolution {
                heads: heads.iter().copied().collect(),
                flows: q,
                emitter_flows: qe,
                iterations: iter + 1,
            });
        }
    }

    Err(HydraulicError::ConvergenceFailed {
        time_s,
        what: format!("no convergence in {} iterations", config.max_iterations),
    })
}
