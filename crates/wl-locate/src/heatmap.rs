//! Per-node aggregation of recovered magnitudes across windows.

use serde::Serialize;

use crate::controller::WindowOutcome;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeatMap {
    pub lp_sum: Vec<f64>,
    pub mip_sum: Vec<f64>,
    /// MIP magnitudes weighted by `1 / (1 + objective)`
    pub weighted: Vec<f64>,
    /// Windows in which the node's recovered magnitude exceeded the threshold
    pub hits: Vec<usize>,
}

impl HeatMap {
    pub fn new(n: usize) -> Self {
        Self {
            lp_sum: vec![0.0; n],
            mip_sum: vec![0.0; n],
            weighted: vec![0.0; n],
            hits: vec![0; n],
        }
    }

    pub fn from_outcomes<'a>(
        n: usize,
        outcomes: impl IntoIterator<Item = &'a WindowOutcome>,
        threshold: f64,
    ) -> Self {
        let mut map = Self::new(n);
        for outcome in outcomes {
            map.add(outcome, threshold);
        }
        map
    }

    pub fn add(&mut self, outcome: &WindowOutcome, threshold: f64) {
        if let Some(lp) = &outcome.lp {
            for (acc, v) in self.lp_sum.iter_mut().zip(&lp.magnitudes) {
                *acc += v;
            }
        }
        if let Some(mip) = &outcome.mip {
            let weight = 1.0 / (1.0 + mip.objective.max(0.0));
            for (j, v) in mip.magnitudes.iter().enumerate() {
                if let (Some(sum), Some(w)) = (self.mip_sum.get_mut(j), self.weighted.get_mut(j)) {
                    *sum += v;
                    *w += weight * v;
                }
            }
        }
        for (hits, v) in self.hits.iter_mut().zip(&outcome.recovered) {
            if *v > threshold {
                *hits += 1;
            }
        }
    }

    /// Weighted scores scaled to `[0, 1]`; all zeros when nothing was found.
    pub fn normalized(&self) -> Vec<f64> {
        normalize(&self.weighted)
    }

    /// Node with the highest weighted score, if any is positive.
    pub fn hottest(&self) -> Option<usize> {
        self.weighted
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > 0.0)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
    }
}

/// Scale by the column maximum; all zeros when the maximum is not positive.
pub fn normalize(values: &[f64]) -> Vec<f64> {
    let max = values.iter().copied().fold(0.0, f64::max);
    if max > 0.0 {
        values.iter().map(|v| v / max).collect()
    } else {
        vec![0.0; values.len()]
    }
}
