use wl_results::*;

fn temp_store(name: &str) -> RunStore {
    let dir = std::env::temp_dir().join(format!("wl_results_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    RunStore::new(dir).unwrap()
}

fn manifest(run_id: &str) -> RunManifest {
    RunManifest {
        run_id: run_id.to_string(),
        project_name: "demo".to_string(),
        content_hash: "abc".to_string(),
        timestamp: "2026-01-01T00:00:00Z".to_string(),
        solver: "microlp".to_string(),
        solver_version: "0.1.0".to_string(),
        seed: 42,
        iterations: 1,
        windows: 2,
        mean_error: 0.25,
        simulations: 40,
        elapsed_s: 1.5,
    }
}

fn report() -> IterationReport {
    IterationReport {
        summary: IterationSummary {
            iteration: 0,
            leaks: vec![LeakSummary {
                node: "J3".to_string(),
                magnitude: 4.0,
            }],
            sensors: vec!["J1".to_string(), "J3".to_string()],
            windows: vec![WindowSummary {
                window: 0,
                start_s: 259_200.0,
                points: 4,
                lp_objective: Some(0.0),
                mip_objective: None,
                rounds: 2,
                reliable: true,
                error: 0.25,
                failures: vec![],
                solution: vec![0.0, 3.75],
            }],
            demand: vec![LeakRow {
                window: 0,
                node: "J3".to_string(),
                magnitude: 4.0,
                leak_lps: 12.0,
                total_lps: 40.0,
                fraction_pct: 30.0,
            }],
            mean_error: 0.25,
            elapsed_s: 0.5,
            simulations: 20,
        },
        estimates: vec![
            EstimateRow {
                window: 0,
                node: "J1".to_string(),
                mip_x: None,
                lp_x: Some(0.0),
            },
            EstimateRow {
                window: 0,
                node: "J3".to_string(),
                mip_x: None,
                lp_x: Some(3.75),
            },
        ],
        near_optima: vec![],
        heat_map: vec![HeatRow {
            node: "J3".to_string(),
            lp_sum: 3.75,
            mip_sum: 0.0,
            weighted: 0.0,
            lp_norm: 1.0,
            mip_norm: 0.0,
            weighted_norm: 0.0,
            hits: 1,
        }],
    }
}

#[test]
fn save_and_load_run() {
    let store = temp_store("save_load");
    let m = manifest("20260101T000000000Z-abc");
    store.save_manifest(&m).unwrap();
    store.save_iteration(&m.run_id, &report()).unwrap();
    let errors = vec![ErrorRow {
        iteration: 0,
        window: 0,
        lp_objective: Some(0.0),
        mip_objective: None,
        model_error: 0.25,
        reliable: true,
    }];
    store.save_errors(&m.run_id, &errors).unwrap();

    assert!(store.has_run(&m.run_id));
    assert_eq!(store.load_manifest(&m.run_id).unwrap(), m);
    assert_eq!(store.load_summary(&m.run_id, 0).unwrap(), report().summary);
    assert_eq!(store.load_errors(&m.run_id).unwrap(), errors);

    let dir = store.run_dir(&m.run_id);
    for file in ["Run_0.csv", "Leaks_0.csv", "HeatMap_0.csv", "Error.csv"] {
        assert!(dir.join(file).exists(), "{file} missing");
    }
    assert!(!dir.join("NearOptima_0.csv").exists());

    let run_csv = std::fs::read_to_string(dir.join("Run_0.csv")).unwrap();
    assert!(run_csv.starts_with("window,node,mip_x,lp_x"));
}

#[test]
fn list_runs_sorted_and_delete() {
    let store = temp_store("list");
    store.save_manifest(&manifest("b-run")).unwrap();
    store.save_manifest(&manifest("a-run")).unwrap();
    std::fs::create_dir_all(store.root_dir().join("stray")).unwrap();

    let ids: Vec<String> = store.list_runs().unwrap().into_iter().map(|m| m.run_id).collect();
    assert_eq!(ids, vec!["a-run", "b-run"]);

    store.delete_run("a-run").unwrap();
    assert!(!store.has_run("a-run"));
    assert_eq!(store.list_runs().unwrap().len(), 1);
}

#[test]
fn missing_run_is_reported() {
    let store = temp_store("missing");
    assert!(matches!(
        store.load_manifest("nope"),
        Err(ResultsError::RunNotFound { .. })
    ));
}

#[test]
fn failed_iteration_write_does_not_drop_the_rest() {
    let store = temp_store("partial");
    let m = manifest("partial-run");
    let first = report();
    let mut second = report();
    second.summary.iteration = 1;
    // A directory where the first summary should go makes that write fail.
    std::fs::create_dir_all(store.run_dir(&m.run_id).join("Summary_0.json")).unwrap();
    let errors = vec![ErrorRow {
        iteration: 1,
        window: 0,
        lp_objective: Some(0.0),
        mip_objective: None,
        model_error: 0.25,
        reliable: true,
    }];

    let failures = store.save_run(&m, &[first, second], &errors).unwrap();

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].what, "iteration 0");
    assert!(store.has_run(&m.run_id));
    assert_eq!(store.load_summary(&m.run_id, 1).unwrap().iteration, 1);
    assert_eq!(store.load_errors(&m.run_id).unwrap(), errors);
    assert!(store.run_dir(&m.run_id).join("HeatMap_1.csv").exists());
}
