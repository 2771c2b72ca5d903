//! The outer experiment loop.
//!
//! Each iteration draws a leak scenario and a sensor subset, simulates the
//! leak-free and leaky network over every analysis window, and refines a
//! leak estimate per window from the pressure residual.

use serde::Serialize;
use tracing::{info, info_span, warn};
use wl_core::{Budget, Stopwatch};
use wl_hydraulics::{HydraulicModel, NodeReadings};
use wl_optim::Solver;

use crate::config::ExperimentConfig;
use crate::controller::{IterationController, PhaseSolution, RoundContext, WindowOutcome};
use crate::error::{LocateResult, check_len};
use crate::evaluate::{model_error, per_node_error};
use crate::event::LocateEvent;
use crate::heatmap::HeatMap;
use crate::near_optima::{NearOptimaTable, near_optima_table};
use crate::scenario::{LeakScenario, ScenarioGenerator, SensorSet};

/// Demand drawn by one injected leak in one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeakDemand {
    pub node: usize,
    pub label: String,
    pub magnitude: f64,
    /// Observed minus leak-free demand at the node, L/s
    pub leak_lps: f64,
    /// Observed network demand, L/s
    pub total_lps: f64,
    /// `leak_lps` as a percentage of `total_lps`
    pub fraction_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowRecord {
    pub window: usize,
    pub start_s: f64,
    pub points: usize,
    pub outcome: WindowOutcome,
    pub error: f64,
    pub node_errors: Vec<f64>,
    pub leak_demands: Vec<LeakDemand>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub leaks: LeakScenario,
    pub leak_labels: Vec<String>,
    pub sensors: SensorSet,
    pub windows: Vec<WindowRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub near_optima: Option<NearOptimaTable>,
    pub heat_map: HeatMap,
    pub elapsed_s: f64,
    pub simulations: usize,
}

impl IterationRecord {
    /// Error averaged over windows.
    pub fn mean_error(&self) -> f64 {
        if self.windows.is_empty() {
            return 0.0;
        }
        self.windows.iter().map(|w| w.error).sum::<f64>() / self.windows.len() as f64
    }

    pub fn reliable(&self) -> bool {
        self.windows.iter().all(|w| w.outcome.reliable)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentReport {
    pub node_labels: Vec<String>,
    pub iterations: Vec<IterationRecord>,
    pub elapsed_s: f64,
}

impl ExperimentReport {
    pub fn errors(&self) -> Vec<f64> {
        self.iterations.iter().map(IterationRecord::mean_error).collect()
    }

    pub fn mean_error(&self) -> f64 {
        let errors = self.errors();
        if errors.is_empty() {
            0.0
        } else {
            errors.iter().sum::<f64>() / errors.len() as f64
        }
    }

    pub fn total_simulations(&self) -> usize {
        self.iterations.iter().map(|i| i.simulations).sum()
    }
}

/// Run every iteration of the experiment.
///
/// Emitters on `model` are cleared on entry and left clear on return.
pub fn run_experiment<M, S>(
    model: &mut M,
    solver: &S,
    config: &ExperimentConfig,
    mut observer: Option<&mut dyn FnMut(LocateEvent)>,
) -> LocateResult<ExperimentReport>
where
    M: HydraulicModel + Clone + Send + Sync,
    S: Solver + ?Sized,
{
    config.validate()?;
    let mut emit = |event: LocateEvent| {
        if let Some(cb) = observer.as_mut() {
            cb(event);
        }
    };

    let clock = Stopwatch::start();
    let n = model.node_count();
    let labels: Vec<String> = (0..n).map(|i| model.node_label(i)).collect();
    let controller = IterationController::new(config.refinement.clone(), config.probe.clone());
    let mut generator = ScenarioGenerator::new(config.scenario.clone());
    model.clear_emitters()?;

    info!(
        nodes = n,
        iterations = config.iterations,
        windows = config.windows.len(),
        "starting experiment"
    );

    let mut iterations = Vec::with_capacity(config.iterations);
    for iteration in 0..config.iterations {
        let span = info_span!("iteration", iteration);
        let _enter = span.enter();
        emit(LocateEvent::IterationStarted {
            iteration,
            total: config.iterations,
        });
        let record = run_iteration(
            model,
            solver,
            config,
            &controller,
            &mut generator,
            &labels,
            iteration,
            &mut emit,
        );
        // Leave the model clean for the next iteration even on failure.
        let cleared = model.clear_emitters();
        let record = record?;
        cleared?;
        emit(LocateEvent::IterationFinished {
            iteration,
            error: record.mean_error(),
        });
        iterations.push(record);
    }

    let report = ExperimentReport {
        node_labels: labels,
        iterations,
        elapsed_s: clock.elapsed_s(),
    };
    info!(
        mean_error = report.mean_error(),
        simulations = report.total_simulations(),
        elapsed_s = report.elapsed_s,
        "experiment finished"
    );
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
fn run_iteration<M, S>(
    model: &mut M,
    solver: &S,
    config: &ExperimentConfig,
    controller: &IterationController,
    generator: &mut ScenarioGenerator,
    labels: &[String],
    iteration: usize,
    observer: &mut dyn FnMut(LocateEvent),
) -> LocateResult<IterationRecord>
where
    M: HydraulicModel + Clone + Send + Sync,
    S: Solver + ?Sized,
{
    let clock = Stopwatch::start();
    let n = labels.len();
    let windows = &config.windows;

    let leaks = generator.next_leaks(labels)?;
    let sensors = generator.next_sensors(labels)?;
    let leak_labels: Vec<String> = leaks.nodes.iter().map(|&i| labels[i].clone()).collect();
    info!(leaks = ?leak_labels, magnitudes = ?leaks.magnitudes, sensors = sensors.len(), "scenario drawn");
    observer(LocateEvent::ScenarioReady {
        iteration,
        leaks: leaks.len(),
        sensors: sensors.len(),
    });

    let mut simulations = 0;
    model.clear_emitters()?;
    let baseline = model.simulate(windows)?;
    for (&node, &magnitude) in leaks.nodes.iter().zip(&leaks.magnitudes) {
        model.set_emitter(node, magnitude)?;
    }
    let observed = model.simulate(windows)?;
    model.clear_emitters()?;
    simulations += 2;
    check_len("baseline windows", windows.len(), baseline.len())?;
    check_len("observed windows", windows.len(), observed.len())?;

    let truth = leaks.truth(n);
    let residuals: Vec<Vec<f64>> = baseline
        .iter()
        .zip(&observed)
        .map(|(base, obs)| residual(base, obs, n))
        .collect::<LocateResult<_>>()?;

    let budget = Budget::from_option(config.refinement.round_budget_s);
    let mut records = Vec::with_capacity(windows.len());
    for (w, window) in windows.iter().enumerate() {
        observer(LocateEvent::WindowStarted {
            iteration,
            window: w,
            total: windows.len(),
        });
        let outcome = controller.run_window(
            model,
            solver,
            window,
            &residuals[w],
            &sensors,
            &budget,
            RoundContext {
                iteration,
                window: w,
            },
            observer,
        )?;
        simulations += outcome.simulations;
        if !outcome.reliable {
            warn!(window = w, failures = outcome.failures.len(), "window estimate is unreliable");
        }
        let error = model_error(&outcome.recovered, &truth)?;
        let node_errors = per_node_error(&outcome.recovered, &truth)?;
        info!(window = w, error, "window scored");
        records.push(WindowRecord {
            window: w,
            start_s: window.start_s,
            points: window.points,
            leak_demands: leak_demands(&leaks, labels, &baseline[w], &observed[w]),
            outcome,
            error,
            node_errors,
        });
    }

    let near_optima = if config.near_optima {
        let solutions: Vec<Option<&PhaseSolution>> =
            records.iter().map(|r| r.outcome.mip.as_ref()).collect();
        let table = near_optima_table(
            controller,
            model,
            solver,
            windows,
            &residuals,
            &solutions,
            &sensors,
            RoundContext {
                iteration,
                window: 0,
            },
            observer,
        )?;
        Some(table)
    } else {
        None
    };

    let heat_map = HeatMap::from_outcomes(
        n,
        records.iter().map(|r| &r.outcome),
        config.refinement.indicator_threshold,
    );

    Ok(IterationRecord {
        iteration,
        leaks,
        leak_labels,
        sensors,
        windows: records,
        near_optima,
        heat_map,
        elapsed_s: clock.elapsed_s(),
        simulations,
    })
}

/// Baseline minus observed pressure per node.
fn residual(base: &NodeReadings, observed: &NodeReadings, n: usize) -> LocateResult<Vec<f64>> {
    check_len("baseline pressures", n, base.len())?;
    check_len("observed pressures", n, observed.len())?;
    Ok(base
        .pressure
        .iter()
        .zip(&observed.pressure)
        .map(|(b, o)| b - o)
        .collect())
}

fn leak_demands(
    leaks: &LeakScenario,
    labels: &[String],
    base: &NodeReadings,
    observed: &NodeReadings,
) -> Vec<LeakDemand> {
    let total = observed.total_demand();
    leaks
        .nodes
        .iter()
        .zip(&leaks.magnitudes)
        .map(|(&node, &magnitude)| {
            let leak = match (observed.demand.get(node), base.demand.get(node)) {
                (Some(o), Some(b)) => o - b,
                _ => 0.0,
            };
            LeakDemand {
                node,
                label: labels.get(node).cloned().unwrap_or_default(),
                magnitude,
                leak_lps: leak,
                total_lps: total,
                fraction_pct: if total > 0.0 { 100.0 * leak / total } else { 0.0 },
            }
        })
        .collect()
}
