//! Project validation logic.

use crate::schema::{ExperimentDef, NetworkDef, Project};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }
    validate_network(&project.network)?;
    validate_experiment(&project.experiment, &project.network)
}

fn validate_network(net: &NetworkDef) -> Result<(), ValidationError> {
    let mut node_ids = HashSet::new();
    for id in net.node_ids() {
        if !node_ids.insert(id) {
            return Err(ValidationError::DuplicateId {
                id: id.to_string(),
                context: "nodes".to_string(),
            });
        }
    }

    let mut pattern_ids = HashSet::new();
    for pattern in &net.patterns {
        if !pattern_ids.insert(pattern.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: pattern.id.clone(),
                context: "patterns".to_string(),
            });
        }
        if pattern.multipliers.is_empty() {
            return Err(invalid(
                format!("pattern '{}' multipliers", pattern.id),
                "[]",
                "must not be empty",
            ));
        }
        for m in &pattern.multipliers {
            non_negative_finite(&format!("pattern '{}' multiplier", pattern.id), *m)?;
        }
    }

    let pattern_ref = |pattern: &Option<String>, owner: &str| match pattern {
        Some(p) if !pattern_ids.contains(p.as_str()) => Err(ValidationError::MissingReference {
            id: p.clone(),
            context: format!("pattern of '{}'", owner),
        }),
        _ => Ok(()),
    };

    for j in &net.junctions {
        finite(&format!("junction '{}' elevation_m", j.id), j.elevation_m)?;
        non_negative_finite(&format!("junction '{}' base_demand_lps", j.id), j.base_demand_lps)?;
        non_negative_finite(&format!("junction '{}' emitter_coeff", j.id), j.emitter_coeff)?;
        pattern_ref(&j.pattern, &j.id)?;
    }
    for r in &net.reservoirs {
        finite(&format!("reservoir '{}' head_m", r.id), r.head_m)?;
        pattern_ref(&r.pattern, &r.id)?;
    }
    for t in &net.tanks {
        finite(&format!("tank '{}' elevation_m", t.id), t.elevation_m)?;
        positive_finite(&format!("tank '{}' diameter_m", t.id), t.diameter_m)?;
        non_negative_finite(&format!("tank '{}' min_level_m", t.id), t.min_level_m)?;
        if !(t.min_level_m <= t.init_level_m && t.init_level_m <= t.max_level_m) {
            return Err(invalid(
                format!("tank '{}' init_level_m", t.id),
                t.init_level_m,
                "must lie between min_level_m and max_level_m",
            ));
        }
    }

    let mut pipe_ids = HashSet::new();
    for p in &net.pipes {
        if !pipe_ids.insert(p.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: p.id.clone(),
                context: "pipes".to_string(),
            });
        }
        for end in [&p.from, &p.to] {
            if !node_ids.contains(end.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: end.clone(),
                    context: format!("pipe '{}'", p.id),
                });
            }
        }
        positive_finite(&format!("pipe '{}' length_m", p.id), p.length_m)?;
        positive_finite(&format!("pipe '{}' diameter_mm", p.id), p.diameter_mm)?;
        positive_finite(&format!("pipe '{}' roughness", p.id), p.roughness)?;
    }

    let opts = &net.options;
    positive_finite("options.duration_h", opts.duration_h)?;
    positive_finite("options.hydraulic_step_s", opts.hydraulic_step_s)?;
    positive_finite("options.pattern_step_s", opts.pattern_step_s)?;
    Ok(())
}

fn validate_experiment(exp: &ExperimentDef, net: &NetworkDef) -> Result<(), ValidationError> {
    for (field, value) in [
        ("experiment.iterations", exp.iterations),
        ("experiment.time_points", exp.time_points),
        ("experiment.periods", exp.periods),
        ("experiment.probe_stride", exp.probe_stride),
        ("experiment.refinement.max_rounds", exp.refinement.max_rounds),
    ] {
        if value == 0 {
            return Err(invalid(field, value, "must be at least 1"));
        }
    }
    if !(exp.min_leak_size > 0.0 && exp.min_leak_size < exp.max_leak_size && exp.max_leak_size.is_finite()) {
        return Err(invalid(
            "experiment.min_leak_size",
            exp.min_leak_size,
            "leak sizes must satisfy 0 < min < max",
        ));
    }
    if !(exp.sensor_fraction > 0.0 && exp.sensor_fraction <= 1.0) {
        return Err(invalid(
            "experiment.sensor_fraction",
            exp.sensor_fraction,
            "must be in (0, 1]",
        ));
    }
    non_negative_finite("experiment.warmup_h", exp.warmup_h)?;
    if let Some(h) = exp.period_hours {
        positive_finite("experiment.period_hours", h)?;
    }

    let junctions: HashSet<&str> = net.junctions.iter().map(|j| j.id.as_str()).collect();
    for id in &exp.ignore_nodes {
        if !junctions.contains(id.as_str()) {
            return Err(ValidationError::MissingReference {
                id: id.clone(),
                context: "experiment.ignore_nodes".to_string(),
            });
        }
    }
    let eligible = junctions.len() - exp.ignore_nodes.iter().collect::<HashSet<_>>().len();
    if exp.num_leaks > eligible {
        return Err(invalid(
            "experiment.num_leaks",
            exp.num_leaks,
            &format!("only {} junctions are eligible", eligible),
        ));
    }

    let r = &exp.refinement;
    positive_finite("refinement.initial_delta", r.initial_delta)?;
    positive_finite("refinement.big_m_safety_factor", r.big_m_safety_factor)?;
    positive_finite("refinement.min_probe_magnitude", r.min_probe_magnitude)?;
    non_negative_finite("refinement.min_leak_threshold", r.min_leak_threshold)?;
    non_negative_finite("refinement.indicator_threshold", r.indicator_threshold)?;
    non_negative_finite("refinement.min_improvement", r.min_improvement)?;
    if r.leak_limit == Some(0) {
        return Err(invalid("refinement.leak_limit", 0, "must be at least 1"));
    }
    if let Some(s) = r.round_budget_s {
        positive_finite("refinement.round_budget_s", s)?;
    }
    Ok(())
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn finite(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(invalid(field, value, "must be finite"));
    }
    Ok(())
}

fn positive_finite(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(field, value, "must be positive and finite"));
    }
    Ok(())
}

fn non_negative_finite(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(field, value, "must be non-negative and finite"));
    }
    Ok(())
}
