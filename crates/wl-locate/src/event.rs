//! Progress notifications emitted while an experiment runs.

use crate::controller::Phase;

#[derive(Debug, Clone, PartialEq)]
pub enum LocateEvent {
    IterationStarted {
        iteration: usize,
        total: usize,
    },
    ScenarioReady {
        iteration: usize,
        leaks: usize,
        sensors: usize,
    },
    WindowStarted {
        iteration: usize,
        window: usize,
        total: usize,
    },
    Round {
        iteration: usize,
        window: usize,
        phase: Phase,
        round: usize,
        objective: f64,
        accepted: bool,
    },
    RoundFailed {
        iteration: usize,
        window: usize,
        phase: Phase,
        round: usize,
        reason: String,
    },
    NearOptima {
        iteration: usize,
        solution_window: usize,
        cost_window: usize,
    },
    IterationFinished {
        iteration: usize,
        error: f64,
    },
}
