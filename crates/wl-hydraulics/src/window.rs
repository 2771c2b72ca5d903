//! Analysis windows: which time steps are averaged into one reading per node.

use crate::eps::SimulationRecord;
use crate::error::{HydraulicError, HydraulicResult};

/// `points` consecutive hydraulic steps starting at the first step at or
/// after `start_s`. Everything before `start_s` (the warm-up) is discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisWindow {
    pub start_s: f64,
    pub points: usize,
}

impl AnalysisWindow {
    pub fn new(start_s: f64, points: usize) -> Self {
        Self { start_s, points }
    }

    /// Time of the last sample for a given hydraulic step.
    pub fn end_s(&self, step_s: f64) -> f64 {
        let first = (self.start_s / step_s).ceil() * step_s;
        first + self.points.saturating_sub(1) as f64 * step_s
    }
}

/// Time-averaged readings per junction for one window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeReadings {
    /// Pressure head, m
    pub pressure: Vec<f64>,
    /// Delivered demand, L/s
    pub demand: Vec<f64>,
}

impl NodeReadings {
    pub fn len(&self) -> usize {
        self.pressure.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pressure.is_empty()
    }

    pub fn total_demand(&self) -> f64 {
        self.demand.iter().sum()
    }
}

pub fn average_window(
    record: &SimulationRecord,
    window: &AnalysisWindow,
) -> HydraulicResult<NodeReadings> {
    if window.points == 0 {
        return Err(HydraulicError::InvalidArg {
            what: "analysis window needs at least one point",
        });
    }
    let rows: Vec<usize> = record
        .times
        .iter()
        .enumerate()
        .filter(|(_, t)| **t >= window.start_s - 1e-9)
        .map(|(i, _)| i)
        .take(window.points)
        .collect();
    if rows.len() < window.points {
        return Err(HydraulicError::WindowOutOfRange {
            start_s: window.start_s,
            points: window.points,
            available: rows.len(),
        });
    }

    let n = record.pressures.first().map_or(0, Vec::len);
    let mut out = NodeReadings {
        pressure: vec![0.0; n],
        demand: vec![0.0; n],
    };
    for &r in &rows {
        for i in 0..n {
            out.pressure[i] += record.pressures[r][i];
            out.demand[i] += record.demands[r][i];
        }
    }
    let scale = 1.0 / rows.len() as f64;
    out.pressure.iter_mut().for_each(|v| *v *= scale);
    out.demand.iter_mut().for_each(|v| *v *= scale);
    Ok(out)
}

/// Consecutive windows after the warm-up, one per analysis period.
pub fn schedule_windows(
    warmup_s: f64,
    period_s: f64,
    periods: usize,
    points: usize,
) -> Vec<AnalysisWindow> {
    (0..periods)
        .map(|l| AnalysisWindow::new(warmup_s + l as f64 * period_s, points))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SimulationRecord {
        SimulationRecord {
            times: vec![0.0, 10.0, 20.0, 30.0, 40.0],
            pressures: vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0], vec![5.0]],
            demands: vec![vec![0.0], vec![0.0], vec![1.0], vec![1.0], vec![4.0]],
            iterations: 0,
        }
    }

    #[test]
    fn averages_after_warmup() {
        let r = average_window(&record(), &AnalysisWindow::new(20.0, 2)).unwrap();
        assert_eq!(r.pressure, vec![3.5]);
        assert_eq!(r.demand, vec![1.0]);
    }

    #[test]
    fn start_between_steps_uses_next_step() {
        let r = average_window(&record(), &AnalysisWindow::new(15.0, 1)).unwrap();
        assert_eq!(r.pressure, vec![3.0]);
    }

    #[test]
    fn short_record_is_an_error() {
        let err = average_window(&record(), &AnalysisWindow::new(30.0, 3)).unwrap_err();
        assert!(matches!(
            err,
            HydraulicError::WindowOutOfRange { available: 2, .. }
        ));
    }

    #[test]
    fn windows_are_spaced_by_period() {
        let w = schedule_windows(100.0, 50.0, 3, 4);
        assert_eq!(w.len(), 3);
        assert_eq!(w[2].start_s, 200.0);
        assert_eq!(w[0].end_s(10.0), 130.0);
    }
}
