//! Core network data structures.

use wl_core::{Flow, Length, LinkId, NodeId, PatternId, Time, hours, meters, s, seconds};

/// Demand node. Leak emitters live here.
#[derive(Debug, Clone, PartialEq)]
pub struct Junction {
    pub elevation: Length,
    pub base_demand: Flow,
    pub pattern: Option<PatternId>,
    /// Emitter coefficient in (L/s)/m^0.5. Zero means no leak.
    pub emitter: f64,
}

impl Junction {
    pub fn new(elevation: Length, base_demand: Flow) -> Self {
        Self {
            elevation,
            base_demand,
            pattern: None,
            emitter: 0.0,
        }
    }

    pub fn with_pattern(mut self, pattern: PatternId) -> Self {
        self.pattern = Some(pattern);
        self
    }
}

/// Fixed-head source.
#[derive(Debug, Clone, PartialEq)]
pub struct Reservoir {
    pub head: Length,
    pub pattern: Option<PatternId>,
}

impl Reservoir {
    pub fn new(head: Length) -> Self {
        Self {
            head,
            pattern: None,
        }
    }
}

/// Cylindrical storage tank. Head is elevation plus level.
#[derive(Debug, Clone, PartialEq)]
pub struct Tank {
    pub elevation: Length,
    pub init_level: Length,
    pub min_level: Length,
    pub max_level: Length,
    pub diameter: Length,
}

impl Tank {
    /// Cross-section area in m².
    pub fn area_m2(&self) -> f64 {
        let d = meters(self.diameter);
        core::f64::consts::PI * d * d / 4.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Junction(Junction),
    Reservoir(Reservoir),
    Tank(Tank),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
}

impl Node {
    pub fn is_junction(&self) -> bool {
        matches!(self.kind, NodeKind::Junction(_))
    }

    /// Reservoirs and tanks fix the head at their node.
    pub fn is_fixed_head(&self) -> bool {
        !self.is_junction()
    }

    pub fn elevation_m(&self) -> f64 {
        match &self.kind {
            NodeKind::Junction(j) => meters(j.elevation),
            NodeKind::Reservoir(r) => meters(r.head),
            NodeKind::Tank(t) => meters(t.elevation),
        }
    }
}

/// Physical pipe data. Head loss follows Hazen-Williams.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipe {
    pub length: Length,
    pub diameter: Length,
    /// Hazen-Williams C factor.
    pub roughness: f64,
}

impl Pipe {
    pub fn new(length: Length, diameter: Length, roughness: f64) -> Self {
        Self {
            length,
            diameter,
            roughness,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: LinkId,
    pub name: String,
    pub from: NodeId,
    pub to: NodeId,
    pub pipe: Pipe,
}

/// Demand multipliers, one per pattern step, repeating.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub id: PatternId,
    pub name: String,
    pub multipliers: Vec<f64>,
}

impl Pattern {
    /// Multiplier for the given pattern period (wraps around).
    pub fn multiplier(&self, period: usize) -> f64 {
        if self.multipliers.is_empty() {
            1.0
        } else {
            self.multipliers[period % self.multipliers.len()]
        }
    }
}

/// Extended-period time settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeOptions {
    pub duration: Time,
    pub hydraulic_step: Time,
    pub pattern_step: Time,
}

impl Default for TimeOptions {
    fn default() -> Self {
        Self {
            duration: hours(96.0),
            hydraulic_step: s(3600.0),
            pattern_step: s(3600.0),
        }
    }
}

impl TimeOptions {
    pub fn duration_s(&self) -> f64 {
        seconds(self.duration)
    }

    pub fn hydraulic_step_s(&self) -> f64 {
        seconds(self.hydraulic_step)
    }

    pub fn pattern_step_s(&self) -> f64 {
        seconds(self.pattern_step)
    }
}

/// A validated, immutable water network.
///
/// Nodes and links are stored in insertion order and indexed by their IDs.
/// Node-to-link adjacency is kept in compact CSR form.
#[derive(Debug, Clone)]
pub struct Network {
    pub(crate) nodes: Vec<Node>,
    pub(crate) links: Vec<Link>,
    pub(crate) patterns: Vec<Pattern>,
    pub(crate) times: TimeOptions,

    /// node i's links are in node_links[node_link_offsets[i]..node_link_offsets[i+1]].
    pub(crate) node_link_offsets: Vec<usize>,
    pub(crate) node_links: Vec<LinkId>,
}

impl Network {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn pipes(&self) -> &[Link] {
        &self.links
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn times(&self) -> &TimeOptions {
        &self.times
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.idx())
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.idx())
    }

    pub fn pattern(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.get(id.idx())
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Links incident to a node.
    pub fn node_links(&self, id: NodeId) -> &[LinkId] {
        let idx = id.idx();
        if idx >= self.nodes.len() {
            return &[];
        }
        &self.node_links[self.node_link_offsets[idx]..self.node_link_offsets[idx + 1]]
    }

    /// Number of junctions (the candidate leak nodes).
    pub fn junction_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_junction()).count()
    }

    /// Replace the time settings, keeping topology.
    pub fn with_times(mut self, times: TimeOptions) -> Self {
        self.times = times;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wl_core::{Id, lps, m};

    #[test]
    fn pattern_wraps() {
        let p = Pattern {
            id: Id::from_index(0),
            name: "P".into(),
            multipliers: vec![0.5, 1.0, 1.5],
        };
        assert_eq!(p.multiplier(0), 0.5);
        assert_eq!(p.multiplier(4), 1.0);
    }

    #[test]
    fn empty_pattern_is_unity() {
        let p = Pattern {
            id: Id::from_index(0),
            name: "P".into(),
            multipliers: vec![],
        };
        assert_eq!(p.multiplier(7), 1.0);
    }

    #[test]
    fn node_kind_helpers() {
        let j = Node {
            id: Id::from_index(0),
            name: "J".into(),
            kind: NodeKind::Junction(Junction::new(m(12.0), lps(1.0))),
        };
        assert!(j.is_junction());
        assert_eq!(j.elevation_m(), 12.0);
        let r = Node {
            id: Id::from_index(1),
            name: "R".into(),
            kind: NodeKind::Reservoir(Reservoir::new(m(40.0))),
        };
        assert!(r.is_fixed_head());
        assert_eq!(r.elevation_m(), 40.0);
    }

    #[test]
    fn default_times() {
        let t = TimeOptions::default();
        assert_eq!(t.duration_s(), 345_600.0);
        assert_eq!(t.hydraulic_step_s(), 3600.0);
    }
}
