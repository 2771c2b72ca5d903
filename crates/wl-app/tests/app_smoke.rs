use std::path::{Path, PathBuf};

use wl_app::{
    RunOptions, RunOverrides, RunProgressEvent, RunRequest, RunStage, build_network,
    experiment_config, list_runs, load_project, load_run, run_with_progress, summarize,
    validate_project,
};
use wl_locate::DeltaPolicy;

fn demo_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/two_loop.yaml")
}

/// A reservoir feeding a four-junction chain, short enough for tests.
fn chain_project(tag: &str) -> (PathBuf, PathBuf) {
    let dir = std::env::temp_dir().join(format!("wl_app_{}_{}", tag, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let yaml = r#"
version: 1
name: Chain
network:
  reservoirs: [{ id: R, head_m: 60.0 }]
  junctions:
    - { id: J1, elevation_m: 10.0, base_demand_lps: 2.0 }
    - { id: J2, elevation_m: 10.0, base_demand_lps: 2.0 }
    - { id: J3, elevation_m: 10.0, base_demand_lps: 2.0 }
    - { id: J4, elevation_m: 10.0, base_demand_lps: 2.0 }
  pipes:
    - { id: P1, from: R, to: J1, length_m: 500.0, diameter_mm: 300.0, roughness: 120.0 }
    - { id: P2, from: J1, to: J2, length_m: 500.0, diameter_mm: 250.0, roughness: 120.0 }
    - { id: P3, from: J2, to: J3, length_m: 500.0, diameter_mm: 200.0, roughness: 120.0 }
    - { id: P4, from: J3, to: J4, length_m: 500.0, diameter_mm: 150.0, roughness: 120.0 }
  options: { duration_h: 6.0, hydraulic_step_s: 3600.0, pattern_step_s: 3600.0 }
experiment:
  iterations: 1
  num_leaks: 1
  min_leak_size: 0.5
  max_leak_size: 2.0
  warmup_h: 1.0
  time_points: 2
  periods: 2
  near_optima: true
  output_dir: runs
  refinement:
    max_rounds: 4
"#;
    let path = dir.join("chain.yaml");
    std::fs::write(&path, yaml).unwrap();
    (dir, path)
}

#[test]
fn demo_project_validates() {
    let project = load_project(&demo_path()).unwrap();
    validate_project(&project).unwrap();
    let summary = summarize(&project);
    assert_eq!(summary.junctions, 6);
    assert_eq!(summary.windows.len(), 2);
    assert_eq!(summary.windows[0].start_s, 72.0 * 3600.0);
    assert_eq!(summary.windows[1].start_s, 76.0 * 3600.0);
}

#[test]
fn window_past_duration_is_rejected() {
    let mut project = load_project(&demo_path()).unwrap();
    project.experiment.periods = 10;
    let network = build_network(&project).unwrap();
    assert!(experiment_config(&project, &network).is_err());
}

#[test]
fn missing_project_file() {
    assert!(load_project(Path::new("/definitely/not/here.yaml")).is_err());
}

#[test]
fn run_persists_and_reloads() {
    let (dir, path) = chain_project("run");
    let request = RunRequest {
        project_path: &path,
        overrides: RunOverrides {
            seed: Some(3),
            policy: Some(DeltaPolicy::CarryForward),
            ..Default::default()
        },
        options: RunOptions::default(),
    };
    let mut events: Vec<RunProgressEvent> = Vec::new();
    let response = run_with_progress(&request, Some(&mut |e| events.push(e))).unwrap();

    for stage in [
        RunStage::LoadingProject,
        RunStage::CompilingNetwork,
        RunStage::GeneratingScenario,
        RunStage::Refining,
        RunStage::SavingResults,
        RunStage::Completed,
    ] {
        assert!(events.iter().any(|e| e.stage == stage), "missing {stage:?}");
    }

    assert_eq!(response.report.iterations.len(), 1);
    assert_eq!(response.manifest.seed, 3);
    assert_eq!(response.manifest.windows, 2);
    assert!(response.manifest.mean_error.is_finite());
    let iteration = &response.report.iterations[0];
    assert_eq!(iteration.windows.len(), 2);
    assert!(iteration.near_optima.is_some());
    assert!(iteration.simulations > 2);

    let run_dir = response.run_dir.clone().unwrap();
    assert!(run_dir.starts_with(dir.join("runs")));
    for file in ["manifest.json", "Summary_0.json", "Run_0.csv", "Leaks_0.csv", "HeatMap_0.csv", "Error.csv"] {
        assert!(run_dir.join(file).exists(), "{file} missing");
    }

    let runs = list_runs(&path, None).unwrap();
    assert_eq!(runs.len(), 1);
    let (manifest, summaries, errors) = load_run(&path, None, &response.run_id).unwrap();
    assert_eq!(manifest.run_id, response.manifest.run_id);
    assert_eq!(manifest.content_hash, response.manifest.content_hash);
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].leaks.len(), 1);
    assert_eq!(errors.len(), 2);
}

#[test]
fn unknown_run_is_not_found() {
    let (_dir, path) = chain_project("missing");
    let err = load_run(&path, None, "nope").unwrap_err();
    assert!(matches!(err, wl_app::AppError::RunNotFound(_)));
}
