//! Engine-level checks of the behavior the localization core relies on.

use wl_core::{hours, lps, m, mm, s};
use wl_hydraulics::{AnalysisWindow, EmitterGuard, HydraulicModel, NetworkModel};
use wl_network::{Junction, Network, NetworkBuilder, Pipe, Reservoir, TimeOptions};

/// R -> J1 -> J2 -> J3 -> J4
fn chain() -> Network {
    let mut b = NetworkBuilder::new();
    let r = b.add_reservoir("R", Reservoir::new(m(60.0)));
    let mut prev = r;
    for i in 1..=4 {
        let j = b.add_junction(format!("J{i}"), Junction::new(m(5.0), lps(2.0)));
        b.add_pipe(format!("P{i}"), prev, j, Pipe::new(m(400.0), mm(150.0), 110.0));
        prev = j;
    }
    b.set_times(TimeOptions {
        duration: hours(6.0),
        hydraulic_step: s(3600.0),
        pattern_step: s(3600.0),
    });
    b.build().unwrap()
}

fn window() -> [AnalysisWindow; 1] {
    [AnalysisWindow::new(2.0 * 3600.0, 3)]
}

#[test]
fn leak_lowers_pressure_most_downstream_of_it() {
    let mut model = NetworkModel::new(&chain()).unwrap();
    let base = model.simulate(&window()).unwrap().remove(0);

    model.set_emitter(2, 1.0).unwrap();
    let leaky = model.simulate(&window()).unwrap().remove(0);

    let drops: Vec<f64> = base
        .pressure
        .iter()
        .zip(&leaky.pressure)
        .map(|(b, l)| b - l)
        .collect();
    assert!(drops.iter().all(|d| *d > 0.0));
    assert!(drops[0] < drops[1] && drops[1] < drops[2]);
    // Dead end beyond the leak sees the same drop as the leak node.
    assert!((drops[3] - drops[2]).abs() < 1e-6);
    assert!(leaky.demand[2] > base.demand[2] + 1.0);
}

#[test]
fn guard_restores_emitter() {
    let mut model = NetworkModel::new(&chain()).unwrap();
    {
        let mut probe = EmitterGuard::set(&mut model, 1, 2.5).unwrap();
        assert_eq!(probe.emitter(1).unwrap(), 2.5);
        probe.simulate(&window()).unwrap();
    }
    assert_eq!(model.emitter(1).unwrap(), 0.0);
    assert_eq!(model.simulations_run(), 1);
}

#[test]
fn window_past_duration_is_rejected() {
    let mut model = NetworkModel::new(&chain()).unwrap();
    assert!(model.simulate(&[AnalysisWindow::new(5.0 * 3600.0, 4)]).is_err());
}

#[test]
fn out_of_range_emitter_is_rejected() {
    let mut model = NetworkModel::new(&chain()).unwrap();
    assert!(model.set_emitter(4, 1.0).is_err());
    assert!(model.set_emitter(0, -1.0).is_err());
}
