use wl_project::{ProjectError, ValidationError, parse_yaml};

const BASE: &str = r#"
version: 1
name: checks
network:
  reservoirs: [{ id: R, head_m: 40.0 }]
  junctions:
    - { id: A, elevation_m: 0.0, base_demand_lps: 1.0 }
    - { id: B, elevation_m: 0.0, base_demand_lps: 1.0 }
  pipes:
    - { id: P1, from: R, to: A, length_m: 100.0, diameter_mm: 100.0, roughness: 100.0 }
    - { id: P2, from: A, to: B, length_m: 100.0, diameter_mm: 100.0, roughness: 100.0 }
"#;

fn with(extra: &str) -> Result<wl_project::Project, ProjectError> {
    parse_yaml(&format!("{BASE}{extra}"))
}

fn validation(result: Result<wl_project::Project, ProjectError>) -> ValidationError {
    match result {
        Err(ProjectError::Validation(e)) => e,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn base_is_valid() {
    assert!(with("").is_ok());
}

#[test]
fn duplicate_node_id() {
    let yaml = BASE.replace("{ id: B,", "{ id: A,");
    let err = validation(parse_yaml(&yaml));
    assert!(matches!(err, ValidationError::DuplicateId { ref id, .. } if id == "A"));
}

#[test]
fn pipe_to_unknown_node() {
    let yaml = BASE.replace("from: A, to: B", "from: A, to: C");
    let err = validation(parse_yaml(&yaml));
    assert!(matches!(err, ValidationError::MissingReference { ref id, .. } if id == "C"));
}

#[test]
fn unknown_pattern() {
    let yaml = BASE.replace("{ id: A, elevation_m: 0.0,", "{ id: A, pattern: nope, elevation_m: 0.0,");
    let err = validation(parse_yaml(&yaml));
    assert!(matches!(err, ValidationError::MissingReference { ref id, .. } if id == "nope"));
}

#[test]
fn non_positive_diameter() {
    let yaml = BASE.replacen("diameter_mm: 100.0", "diameter_mm: 0.0", 1);
    let err = validation(parse_yaml(&yaml));
    assert!(matches!(err, ValidationError::InvalidValue { .. }));
}

#[test]
fn too_many_leaks() {
    let err = validation(with("experiment:\n  num_leaks: 3\n"));
    assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "experiment.num_leaks"));
}

#[test]
fn ignored_node_must_exist() {
    let err = validation(with("experiment:\n  num_leaks: 1\n  ignore_nodes: [Z]\n"));
    assert!(matches!(err, ValidationError::MissingReference { ref id, .. } if id == "Z"));
}

#[test]
fn inverted_leak_sizes() {
    let err = validation(with("experiment:\n  min_leak_size: 5.0\n  max_leak_size: 2.0\n"));
    assert!(matches!(err, ValidationError::InvalidValue { .. }));
}

#[test]
fn future_version_rejected() {
    let yaml = BASE.replace("version: 1", "version: 9");
    let err = validation(parse_yaml(&yaml));
    assert!(matches!(err, ValidationError::UnsupportedVersion { version: 9 }));
}

#[test]
fn zero_probe_stride() {
    let err = validation(with("experiment:\n  probe_stride: 0\n"));
    assert!(matches!(err, ValidationError::InvalidValue { .. }));
}
