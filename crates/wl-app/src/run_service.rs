//! Experiment execution and run persistence.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, warn};
use wl_hydraulics::NetworkModel;
use wl_locate::{DeltaPolicy, ExperimentReport, LocateEvent, run_experiment};
use wl_optim::{GoodLpSolver, RetryingSolver, Solver};
use wl_project::schema::{PolicyDef, Project};
use wl_results::{
    ErrorRow, IterationSummary, ResultsResult, RunManifest, RunStore, compute_content_hash,
    compute_run_id,
};

use crate::error::AppResult;
use crate::progress::{LocateProgress, RunProgressEvent, RunStage};
use crate::project_service;
use crate::report;

/// Command-line style overrides applied on top of the project file.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub iterations: Option<usize>,
    pub seed: Option<u64>,
    /// Applied to both the LP and the MIP phase
    pub policy: Option<DeltaPolicy>,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Write the run directory; a failed write is logged, not fatal.
    pub persist: bool,
    pub solver_version: String,
    pub hydraulic_retries: usize,
    pub solver_retries: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            persist: true,
            solver_version: env!("CARGO_PKG_VERSION").to_string(),
            hydraulic_retries: 1,
            solver_retries: 1,
        }
    }
}

pub struct RunRequest<'a> {
    pub project_path: &'a Path,
    pub overrides: RunOverrides,
    pub options: RunOptions,
}

#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub load_time_s: f64,
    pub compile_time_s: f64,
    pub experiment_time_s: f64,
    pub save_time_s: f64,
    pub total_time_s: f64,
    pub simulations: usize,
}

#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub report: ExperimentReport,
    /// `None` when persistence was disabled or failed
    pub run_dir: Option<PathBuf>,
    pub timing: RunTimingSummary,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    locate: Option<LocateProgress>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            locate,
        });
    }
}

fn policy_def(policy: DeltaPolicy) -> PolicyDef {
    match policy {
        DeltaPolicy::TopKAverage => PolicyDef::TopKAverage,
        DeltaPolicy::CarryForward => PolicyDef::CarryForward,
    }
}

fn apply_overrides(project: &mut Project, overrides: &RunOverrides) {
    let exp = &mut project.experiment;
    if let Some(n) = overrides.iterations {
        exp.iterations = n;
    }
    if let Some(seed) = overrides.seed {
        exp.seed = seed;
    }
    if let Some(policy) = overrides.policy {
        exp.refinement.lp_policy = policy_def(policy);
        exp.refinement.mip_policy = Some(policy_def(policy));
    }
    if let Some(dir) = &overrides.output_dir {
        exp.output_dir = dir.to_string_lossy().to_string();
    }
}

fn to_progress(event: &LocateEvent, total_iterations: usize) -> (RunStage, LocateProgress) {
    let base = |iteration: usize| LocateProgress {
        iteration,
        total_iterations,
        ..Default::default()
    };
    match event {
        LocateEvent::IterationStarted { iteration, .. }
        | LocateEvent::ScenarioReady { iteration, .. } => {
            (RunStage::GeneratingScenario, base(*iteration))
        }
        LocateEvent::WindowStarted {
            iteration, window, ..
        } => (
            RunStage::Refining,
            LocateProgress {
                window: Some(*window),
                ..base(*iteration)
            },
        ),
        LocateEvent::Round {
            iteration,
            window,
            phase,
            round,
            objective,
            ..
        } => (
            RunStage::Refining,
            LocateProgress {
                window: Some(*window),
                phase: Some(*phase),
                round: Some(*round),
                objective: Some(*objective),
                ..base(*iteration)
            },
        ),
        LocateEvent::RoundFailed {
            iteration,
            window,
            phase,
            round,
            ..
        } => (
            RunStage::Refining,
            LocateProgress {
                window: Some(*window),
                phase: Some(*phase),
                round: Some(*round),
                ..base(*iteration)
            },
        ),
        LocateEvent::NearOptima {
            iteration,
            solution_window,
            ..
        } => (
            RunStage::NearOptima,
            LocateProgress {
                window: Some(*solution_window),
                ..base(*iteration)
            },
        ),
        LocateEvent::IterationFinished { iteration, .. } => (RunStage::Refining, base(*iteration)),
    }
}

fn describe(event: &LocateEvent) -> Option<String> {
    match event {
        LocateEvent::ScenarioReady { leaks, sensors, .. } => {
            Some(format!("{leaks} leak(s), {sensors} sensor(s)"))
        }
        LocateEvent::RoundFailed { reason, .. } => Some(reason.clone()),
        LocateEvent::IterationFinished { error, .. } => Some(format!("model error {error:.4}")),
        _ => None,
    }
}

/// Run an experiment without progress reporting.
pub fn run(request: &RunRequest) -> AppResult<RunResponse> {
    run_with_progress(request, None)
}

/// Load, compile, run and persist an experiment, streaming progress events.
pub fn run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mut timing = RunTimingSummary::default();

    emit_progress(
        &mut progress_cb,
        RunStage::LoadingProject,
        started,
        Some("Loading project".to_string()),
        None,
    );
    let mut project = project_service::load_project(request.project_path)?;
    apply_overrides(&mut project, &request.overrides);
    wl_project::validate_project(&project).map_err(wl_project::ProjectError::from)?;
    timing.load_time_s = started.elapsed().as_secs_f64();

    emit_progress(
        &mut progress_cb,
        RunStage::CompilingNetwork,
        started,
        Some("Compiling network".to_string()),
        None,
    );
    let compile_start = Instant::now();
    let network = project_service::build_network(&project)?;
    let config = project_service::experiment_config(&project, &network)?;
    let mut model = NetworkModel::new(&network)?.with_max_retries(request.options.hydraulic_retries);
    let solver = RetryingSolver::new(GoodLpSolver::new(), request.options.solver_retries);
    timing.compile_time_s = compile_start.elapsed().as_secs_f64();

    let experiment_start = Instant::now();
    let total = config.iterations;
    let timestamp = chrono::Utc::now();
    let report = run_experiment(
        &mut model,
        &solver,
        &config,
        Some(&mut |event: LocateEvent| {
            let (stage, locate) = to_progress(&event, total);
            emit_progress(&mut progress_cb, stage, started, describe(&event), Some(locate));
        }),
    )?;
    timing.experiment_time_s = experiment_start.elapsed().as_secs_f64();
    timing.simulations = report.total_simulations();

    let content_hash = compute_content_hash(&project, solver.name(), &request.options.solver_version);
    let run_id = compute_run_id(&timestamp, &content_hash);
    let manifest = RunManifest {
        run_id: run_id.clone(),
        project_name: project.name.clone(),
        content_hash,
        timestamp: timestamp.to_rfc3339(),
        solver: solver.name().to_string(),
        solver_version: request.options.solver_version.clone(),
        seed: project.experiment.seed,
        iterations: report.iterations.len(),
        windows: config.windows.len(),
        mean_error: report.mean_error(),
        simulations: report.total_simulations(),
        elapsed_s: report.elapsed_s,
    };

    let mut run_dir = None;
    if request.options.persist {
        emit_progress(
            &mut progress_cb,
            RunStage::SavingResults,
            started,
            Some("Saving results".to_string()),
            None,
        );
        let save_start = Instant::now();
        match save_run(request.project_path, &project, &manifest, &report) {
            Ok(dir) => {
                info!(run_id = %run_id, dir = %dir.display(), "run saved");
                run_dir = Some(dir);
            }
            Err(e) => warn!(run_id = %run_id, error = %e, "failed to save run"),
        }
        timing.save_time_s = save_start.elapsed().as_secs_f64();
    }

    timing.total_time_s = started.elapsed().as_secs_f64();
    emit_progress(
        &mut progress_cb,
        RunStage::Completed,
        started,
        Some(format!("Mean model error {:.4}", manifest.mean_error)),
        None,
    );

    Ok(RunResponse {
        run_id,
        manifest,
        report,
        run_dir,
        timing,
    })
}

fn save_run(
    project_path: &Path,
    project: &Project,
    manifest: &RunManifest,
    report: &ExperimentReport,
) -> ResultsResult<PathBuf> {
    let store = RunStore::for_project(project_path, &project.experiment.output_dir)?;
    let iterations: Vec<_> = report
        .iterations
        .iter()
        .map(|record| report::iteration_report(record, &report.node_labels))
        .collect();
    let failures = store.save_run(manifest, &iterations, &report::error_rows(report))?;
    for failure in &failures {
        warn!(
            run_id = %manifest.run_id,
            what = %failure.what,
            error = %failure.error,
            "failed to save report"
        );
    }
    Ok(store.run_dir(&manifest.run_id))
}

fn store_for(project_path: &Path, output_dir: Option<&Path>) -> AppResult<RunStore> {
    let dir = match output_dir {
        Some(dir) => dir.to_string_lossy().to_string(),
        None => project_service::load_project(project_path)?.experiment.output_dir,
    };
    Ok(RunStore::for_project(project_path, &dir)?)
}

/// Saved runs of a project, oldest first.
pub fn list_runs(project_path: &Path, output_dir: Option<&Path>) -> AppResult<Vec<RunManifest>> {
    Ok(store_for(project_path, output_dir)?.list_runs()?)
}

/// Manifest, per-iteration summaries and the error table of a saved run.
pub fn load_run(
    project_path: &Path,
    output_dir: Option<&Path>,
    run_id: &str,
) -> AppResult<(RunManifest, Vec<IterationSummary>, Vec<ErrorRow>)> {
    let store = store_for(project_path, output_dir)?;
    let manifest = store.load_manifest(run_id)?;
    let summaries = (0..manifest.iterations)
        .map(|k| store.load_summary(run_id, k))
        .collect::<ResultsResult<Vec<_>>>()?;
    let errors = store.load_errors(run_id)?;
    Ok((manifest, summaries, errors))
}
