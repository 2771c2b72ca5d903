//! Flattening experiment records into result tables.

use wl_locate::heatmap::normalize;
use wl_locate::{ExperimentReport, IterationRecord};
use wl_results::{
    ErrorRow, EstimateRow, HeatRow, IterationReport, IterationSummary, LeakRow, LeakSummary,
    NearOptimaRow, WindowSummary,
};

pub fn iteration_report(record: &IterationRecord, labels: &[String]) -> IterationReport {
    let label = |i: usize| labels.get(i).cloned().unwrap_or_else(|| format!("#{i}"));

    let windows = record
        .windows
        .iter()
        .map(|w| WindowSummary {
            window: w.window,
            start_s: w.start_s,
            points: w.points,
            lp_objective: w.outcome.lp_objective(),
            mip_objective: w.outcome.mip_objective(),
            rounds: w.outcome.rounds.len(),
            reliable: w.outcome.reliable,
            error: w.error,
            failures: w
                .outcome
                .failures
                .iter()
                .map(|f| format!("{} round {}: {}", f.phase.label(), f.round, f.reason))
                .collect(),
            solution: w.outcome.recovered.clone(),
        })
        .collect();

    let demand = record
        .windows
        .iter()
        .flat_map(|w| {
            w.leak_demands.iter().map(move |d| LeakRow {
                window: w.window,
                node: d.label.clone(),
                magnitude: d.magnitude,
                leak_lps: d.leak_lps,
                total_lps: d.total_lps,
                fraction_pct: d.fraction_pct,
            })
        })
        .collect();

    let summary = IterationSummary {
        iteration: record.iteration,
        leaks: record
            .leak_labels
            .iter()
            .zip(&record.leaks.magnitudes)
            .map(|(node, &magnitude)| LeakSummary {
                node: node.clone(),
                magnitude,
            })
            .collect(),
        sensors: record.sensors.nodes().iter().map(|&i| label(i)).collect(),
        windows,
        demand,
        mean_error: record.mean_error(),
        elapsed_s: record.elapsed_s,
        simulations: record.simulations,
    };

    let mut estimates = Vec::new();
    for w in &record.windows {
        for i in 0..labels.len() {
            let pick = |s: &Option<wl_locate::PhaseSolution>| {
                s.as_ref().and_then(|s| s.magnitudes.get(i).copied())
            };
            estimates.push(EstimateRow {
                window: w.window,
                node: label(i),
                mip_x: pick(&w.outcome.mip),
                lp_x: pick(&w.outcome.lp),
            });
        }
    }

    let near_optima = record
        .near_optima
        .iter()
        .flat_map(|table| {
            table.objectives.iter().enumerate().flat_map(|(l, row)| {
                row.iter().enumerate().map(move |(m, objective)| NearOptimaRow {
                    solution_window: l,
                    cost_window: m,
                    objective: *objective,
                })
            })
        })
        .collect();

    let map = &record.heat_map;
    let (lp_norm, mip_norm, weighted_norm) = (
        normalize(&map.lp_sum),
        normalize(&map.mip_sum),
        normalize(&map.weighted),
    );
    let heat_map = (0..map.lp_sum.len())
        .map(|i| HeatRow {
            node: label(i),
            lp_sum: map.lp_sum[i],
            mip_sum: map.mip_sum[i],
            weighted: map.weighted[i],
            lp_norm: lp_norm[i],
            mip_norm: mip_norm[i],
            weighted_norm: weighted_norm[i],
            hits: map.hits[i],
        })
        .collect();

    IterationReport {
        summary,
        estimates,
        near_optima,
        heat_map,
    }
}

pub fn error_rows(report: &ExperimentReport) -> Vec<ErrorRow> {
    report
        .iterations
        .iter()
        .flat_map(|it| {
            it.windows.iter().map(move |w| ErrorRow {
                iteration: it.iteration,
                window: w.window,
                lp_objective: w.outcome.lp_objective(),
                mip_objective: w.outcome.mip_objective(),
                model_error: w.error,
                reliable: w.outcome.reliable,
            })
        })
        .collect()
}
