//! Magnitude-selection policies: how a solution becomes the next probe magnitudes.

use tracing::warn;
use wl_core::{Tolerances, nearly_equal};

use crate::config::{DeltaPolicy, RefinementConfig};
use crate::error::{LocateError, LocateResult};

/// Values this close count as the same magnitude in top-K selection.
const DISTINCT_TOL: Tolerances = Tolerances {
    abs: 1e-9,
    rel: 1e-9,
};

/// Indices of the `k` largest distinct positive values of `x`.
///
/// Selection walks indices sorted by value, descending; ties keep the lower
/// index. A value within tolerance of one already chosen is skipped.
pub fn top_k_distinct(x: &[f64], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..x.len()).filter(|&i| x[i] > 0.0).collect();
    order.sort_by(|&a, &b| x[b].total_cmp(&x[a]).then(a.cmp(&b)));

    let mut picked: Vec<usize> = Vec::with_capacity(k);
    for i in order {
        if picked.len() == k {
            break;
        }
        if picked
            .iter()
            .any(|&p| nearly_equal(x[p], x[i], DISTINCT_TOL))
        {
            continue;
        }
        picked.push(i);
    }
    picked
}

/// Number of candidates whose magnitude exceeds `threshold`.
pub fn leak_limit(x: &[f64], threshold: f64) -> usize {
    x.iter().filter(|v| **v > threshold).count()
}

/// Floor probe magnitudes before a sensitivity pass.
///
/// Non-finite magnitudes are rejected. Returns how many entries were floored.
pub fn floor_deltas(deltas: &mut [f64], min_magnitude: f64) -> LocateResult<usize> {
    let mut floored = 0;
    for (node, d) in deltas.iter_mut().enumerate() {
        if !d.is_finite() {
            return Err(LocateError::DegenerateProbeMagnitude { node, value: *d });
        }
        if *d < min_magnitude {
            *d = min_magnitude;
            floored += 1;
        }
    }
    if floored > 0 {
        warn!(floored, min_magnitude, "probe magnitudes floored");
    }
    Ok(floored)
}

/// Next-round probe magnitudes from the first `N` solution entries.
///
/// `k` is the leak count used by top-K averaging.
pub fn next_deltas(policy: DeltaPolicy, x: &[f64], k: usize, cfg: &RefinementConfig) -> Vec<f64> {
    match policy {
        DeltaPolicy::TopKAverage => {
            let top = top_k_distinct(x, k.max(1));
            let value = if top.is_empty() {
                cfg.initial_delta
            } else {
                top.iter().map(|&i| x[i]).sum::<f64>() / top.len() as f64
            };
            vec![value; x.len()]
        }
        DeltaPolicy::CarryForward => x
            .iter()
            .map(|&v| {
                if v > cfg.min_leak_threshold {
                    v
                } else {
                    cfg.initial_delta
                }
            })
            .collect(),
    }
}
