//! Project loading, validation, and translation into runtime types.

use std::path::Path;

use wl_core::{hours, lps, m, mm, s};
use wl_hydraulics::{AnalysisWindow, schedule_windows};
use wl_locate::{DeltaPolicy, ExperimentConfig, ProbeConfig, RefinementConfig, ScenarioConfig};
use wl_network::{Junction, Network, NetworkBuilder, Pipe, Reservoir, Tank, TimeOptions};
use wl_project::schema::{ExperimentDef, NetworkDef, PolicyDef, Project};

use crate::error::{AppError, AppResult};

/// Counts shown by `info`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSummary {
    pub name: String,
    pub junctions: usize,
    pub reservoirs: usize,
    pub tanks: usize,
    pub pipes: usize,
    pub patterns: usize,
    pub duration_h: f64,
    pub windows: Vec<AnalysisWindow>,
}

/// Load, migrate and validate a project file (YAML, or JSON by extension).
pub fn load_project(path: &Path) -> AppResult<Project> {
    if !path.exists() {
        return Err(AppError::ProjectFileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
    }
    Ok(wl_project::load(path)?)
}

pub fn save_project(path: &Path, project: &Project) -> AppResult<()> {
    Ok(wl_project::save_yaml(path, project)?)
}

/// Schema checks plus a trial network build and window check.
pub fn validate_project(project: &Project) -> AppResult<()> {
    wl_project::validate_project(project).map_err(|e| AppError::Project(e.to_string()))?;
    let network = build_network(project)?;
    experiment_config(project, &network)?;
    Ok(())
}

pub fn summarize(project: &Project) -> ProjectSummary {
    let net = &project.network;
    ProjectSummary {
        name: project.name.clone(),
        junctions: net.junctions.len(),
        reservoirs: net.reservoirs.len(),
        tanks: net.tanks.len(),
        pipes: net.pipes.len(),
        patterns: net.patterns.len(),
        duration_h: net.options.duration_h,
        windows: windows(&project.experiment, net),
    }
}

/// Translate the network section into a validated `Network`.
pub fn build_network(project: &Project) -> AppResult<Network> {
    let def = &project.network;
    let mut builder = NetworkBuilder::new();

    for p in &def.patterns {
        builder.add_pattern(p.id.as_str(), p.multipliers.clone());
    }
    let pattern = |builder: &NetworkBuilder, id: &Option<String>| -> AppResult<_> {
        match id {
            None => Ok(None),
            Some(id) => builder
                .pattern_id(id)
                .map(Some)
                .ok_or_else(|| AppError::InvalidInput(format!("unknown pattern '{id}'"))),
        }
    };

    for j in &def.junctions {
        let mut junction = Junction::new(m(j.elevation_m), lps(j.base_demand_lps));
        junction.pattern = pattern(&builder, &j.pattern)?;
        junction.emitter = j.emitter_coeff;
        builder.add_junction(j.id.as_str(), junction);
    }
    for r in &def.reservoirs {
        let mut reservoir = Reservoir::new(m(r.head_m));
        reservoir.pattern = pattern(&builder, &r.pattern)?;
        builder.add_reservoir(r.id.as_str(), reservoir);
    }
    for t in &def.tanks {
        builder.add_tank(
            t.id.as_str(),
            Tank {
                elevation: m(t.elevation_m),
                init_level: m(t.init_level_m),
                min_level: m(t.min_level_m),
                max_level: m(t.max_level_m),
                diameter: m(t.diameter_m),
            },
        );
    }
    for p in &def.pipes {
        let node = |id: &str| {
            builder
                .node_id(id)
                .ok_or_else(|| AppError::InvalidInput(format!("pipe '{}' references unknown node '{id}'", p.id)))
        };
        let (from, to) = (node(&p.from)?, node(&p.to)?);
        builder.add_pipe(
            p.id.as_str(),
            from,
            to,
            Pipe::new(m(p.length_m), mm(p.diameter_mm), p.roughness),
        );
    }
    builder.set_times(TimeOptions {
        duration: hours(def.options.duration_h),
        hydraulic_step: s(def.options.hydraulic_step_s),
        pattern_step: s(def.options.pattern_step_s),
    });

    Ok(builder.build()?)
}

fn windows(exp: &ExperimentDef, net: &NetworkDef) -> Vec<AnalysisWindow> {
    let step = net.options.hydraulic_step_s;
    let period_s = exp
        .period_hours
        .map(|h| h * 3600.0)
        .unwrap_or(exp.time_points as f64 * step);
    schedule_windows(exp.warmup_h * 3600.0, period_s, exp.periods, exp.time_points)
}

fn policy(def: PolicyDef) -> DeltaPolicy {
    match def {
        PolicyDef::TopKAverage => DeltaPolicy::TopKAverage,
        PolicyDef::CarryForward => DeltaPolicy::CarryForward,
    }
}

/// Translate the experiment section, checking its windows fit the simulation.
pub fn experiment_config(project: &Project, network: &Network) -> AppResult<ExperimentConfig> {
    let exp = &project.experiment;
    let r = &exp.refinement;
    let windows = windows(exp, &project.network);

    let step = network.times().hydraulic_step_s();
    let duration = network.times().duration_s();
    if let Some(w) = windows.iter().find(|w| w.end_s(step) > duration + 1e-9) {
        return Err(AppError::InvalidInput(format!(
            "analysis window starting at {} h ends after the {} h simulation",
            w.start_s / 3600.0,
            duration / 3600.0
        )));
    }

    let config = ExperimentConfig {
        iterations: exp.iterations,
        scenario: ScenarioConfig {
            seed: exp.seed,
            num_leaks: exp.num_leaks,
            min_leak_size: exp.min_leak_size,
            max_leak_size: exp.max_leak_size,
            ignore_nodes: exp.ignore_nodes.clone(),
            sensor_fraction: exp.sensor_fraction,
        },
        windows,
        refinement: RefinementConfig {
            lp_policy: policy(r.lp_policy),
            mip_policy: policy(r.mip_policy.unwrap_or_default()),
            initial_delta: r.initial_delta,
            min_leak_threshold: r.min_leak_threshold,
            indicator_threshold: r.indicator_threshold,
            max_rounds: r.max_rounds,
            min_improvement: r.min_improvement,
            mip_polish: r.mip_polish,
            warm_start: r.warm_start,
            max_plausible_leak: exp.max_leak_size,
            big_m_safety_factor: r.big_m_safety_factor,
            big_m_retries: r.big_m_retries,
            leak_limit: r.leak_limit,
            round_budget_s: r.round_budget_s,
        },
        probe: ProbeConfig {
            stride: exp.probe_stride,
            min_magnitude: r.min_probe_magnitude,
            parallel: exp.parallel_probes,
        },
        near_optima: exp.near_optima,
    };
    config.validate()?;
    Ok(config)
}
