//! Lowering a validated `Network` into flat arrays for the gradient method.

use wl_core::{cms, meters};
use wl_network::{Network, NodeKind, TimeOptions};

use crate::error::{HydraulicError, HydraulicResult};
use crate::headloss::hazen_williams_resistance;

/// Endpoint of a compiled link: an unknown-head junction or a fixed-head node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEnd {
    Junction(usize),
    Fixed(usize),
}

#[derive(Debug, Clone)]
pub struct CompiledLink {
    pub name: String,
    pub from: LinkEnd,
    pub to: LinkEnd,
    pub resistance: f64,
    /// Flow at 0.3 m/s, used to seed the first solve.
    pub init_flow: f64,
}

#[derive(Debug, Clone)]
pub enum FixedKind {
    Reservoir {
        head: f64,
        pattern: Option<usize>,
    },
    Tank {
        elevation: f64,
        init_level: f64,
        min_level: f64,
        max_level: f64,
        area: f64,
    },
}

#[derive(Debug, Clone)]
pub struct FixedNode {
    pub name: String,
    pub kind: FixedKind,
}

/// Flat, solver-ready view of a network.
#[derive(Debug, Clone)]
pub struct HydraulicNetwork {
    pub junction_names: Vec<String>,
    pub elevations: Vec<f64>,
    /// Base demand in m³/s.
    pub base_demands: Vec<f64>,
    pub demand_patterns: Vec<Option<usize>>,
    /// Emitter coefficients declared in the network file, (L/s)/m^0.5.
    pub base_emitters: Vec<f64>,
    pub patterns: Vec<Vec<f64>>,
    pub fixed: Vec<FixedNode>,
    pub links: Vec<CompiledLink>,
    pub times: TimeOptions,
}

impl HydraulicNetwork {
    pub fn compile(net: &Network) -> HydraulicResult<Self> {
        let mut slot = vec![LinkEnd::Fixed(usize::MAX); net.nodes().len()];
        let mut junction_names = Vec::new();
        let mut elevations = Vec::new();
        let mut base_demands = Vec::new();
        let mut demand_patterns = Vec::new();
        let mut base_emitters = Vec::new();
        let mut fixed = Vec::new();

        for node in net.nodes() {
            match &node.kind {
                NodeKind::Junction(j) => {
                    slot[node.id.idx()] = LinkEnd::Junction(junction_names.len());
                    junction_names.push(node.name.clone());
                    elevations.push(meters(j.elevation));
                    base_demands.push(cms(j.base_demand));
                    demand_patterns.push(j.pattern.map(|p| p.idx()));
                    base_emitters.push(j.emitter);
                }
                NodeKind::Reservoir(r) => {
                    slot[node.id.idx()] = LinkEnd::Fixed(fixed.len());
                    fixed.push(FixedNode {
                        name: node.name.clone(),
                        kind: FixedKind::Reservoir {
                            head: meters(r.head),
                            pattern: r.pattern.map(|p| p.idx()),
                        },
                    });
                }
                NodeKind::Tank(t) => {
                    slot[node.id.idx()] = LinkEnd::Fixed(fixed.len());
                    fixed.push(FixedNode {
                        name: node.name.clone(),
                        kind: FixedKind::Tank {
                            elevation: meters(t.elevation),
                            init_level: meters(t.init_level),
                            min_level: meters(t.min_level),
                            max_level: meters(t.max_level),
                            area: t.area_m2(),
                        },
                    });
                }
            }
        }

        let mut links = Vec::with_capacity(net.pipes().len());
        for link in net.pipes() {
            let d = meters(link.pipe.diameter);
            let resistance =
                hazen_williams_resistance(meters(link.pipe.length), d, link.pipe.roughness);
            if !resistance.is_finite() || resistance <= 0.0 {
                return Err(HydraulicError::ProblemSetup {
                    what: format!("pipe {} has degenerate resistance {resistance}", link.name),
                });
            }
            links.push(CompiledLink {
                name: link.name.clone(),
                from: slot[link.from.idx()],
                to: slot[link.to.idx()],
                resistance,
                init_flow: 0.3 * core::f64::consts::PI * d * d / 4.0,
            });
        }

        Ok(Self {
            junction_names,
            elevations,
            base_demands,
            demand_patterns,
            base_emitters,
            patterns: net.patterns().iter().map(|p| p.multipliers.clone()).collect(),
            fixed,
            links,
            times: net.times().clone(),
        })
    }

    pub fn junction_count(&self) -> usize {
        self.junction_names.len()
    }

    /// Multiplier of `pattern` during pattern period `period`.
    pub fn multiplier(&self, pattern: Option<usize>, period: usize) -> f64 {
        match pattern.and_then(|p| self.patterns.get(p)) {
            Some(m) if !m.is_empty() => m[period % m.len()],
            _ => 1.0,
        }
    }

    /// Junction demands (m³/s) during the given pattern period.
    pub fn demands_at(&self, period: usize) -> Vec<f64> {
        self.base_demands
            .iter()
            .zip(&self.demand_patterns)
            .map(|(d, p)| d * self.multiplier(*p, period))
            .collect()
    }

    /// Initial heads of the fixed-head nodes.
    pub fn initial_fixed_heads(&self, period: usize) -> Vec<f64> {
        self.fixed
            .iter()
            .map(|f| match &f.kind {
                FixedKind::Reservoir { head, pattern } => head * self.multiplier(*pattern, period),
                FixedKind::Tank {
                    elevation,
                    init_level,
                    ..
                } => elevation + init_level,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wl_core::{lps, m, mm};
    use wl_network::{Junction, NetworkBuilder, Pipe, Reservoir};

    #[test]
    fn compile_maps_endpoints_and_units() {
        let mut b = NetworkBuilder::new();
        let j1 = b.add_junction("J1", Junction::new(m(3.0), lps(2.0)));
        let r = b.add_reservoir("R", Reservoir::new(m(40.0)));
        b.add_pipe("P1", r, j1, Pipe::new(m(100.0), mm(200.0), 120.0));
        let hn = HydraulicNetwork::compile(&b.build().unwrap()).unwrap();

        assert_eq!(hn.junction_count(), 1);
        assert!((hn.base_demands[0] - 0.002).abs() < 1e-12);
        assert_eq!(hn.links[0].from, LinkEnd::Fixed(0));
        assert_eq!(hn.links[0].to, LinkEnd::Junction(0));
        assert_eq!(hn.initial_fixed_heads(0), vec![40.0]);
    }

    #[test]
    fn demands_follow_pattern() {
        let mut b = NetworkBuilder::new();
        let pat = b.add_pattern("P", vec![0.5, 2.0]);
        let j1 = b.add_junction("J1", Junction::new(m(0.0), lps(1.0)).with_pattern(pat));
        let r = b.add_reservoir("R", Reservoir::new(m(40.0)));
        b.add_pipe("P1", r, j1, Pipe::new(m(100.0), mm(200.0), 120.0));
        let hn = HydraulicNetwork::compile(&b.build().unwrap()).unwrap();

        assert!((hn.demands_at(0)[0] - 0.0005).abs() < 1e-12);
        assert!((hn.demands_at(3)[0] - 0.002).abs() < 1e-12);
    }
}
