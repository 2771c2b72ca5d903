//! Incremental network builder.

use std::collections::HashMap;
use wl_core::{LinkId, NodeId, PatternId};

use crate::error::NetworkResult;
use crate::network::{
    Junction, Link, Network, Node, NodeKind, Pattern, Pipe, Reservoir, Tank, TimeOptions,
};
use crate::validate;

/// Builder for constructing a network incrementally.
///
/// Add nodes, pipes and patterns, then call `build()` to validate and
/// freeze the result into an immutable `Network`.
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    nodes: Vec<Node>,
    links: Vec<Link>,
    patterns: Vec<Pattern>,
    times: TimeOptions,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let id = NodeId::from_index(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            name: name.into(),
            kind,
        });
        id
    }

    pub fn add_junction(&mut self, name: impl Into<String>, junction: Junction) -> NodeId {
        self.push_node(name, NodeKind::Junction(junction))
    }

    pub fn add_reservoir(&mut self, name: impl Into<String>, reservoir: Reservoir) -> NodeId {
        self.push_node(name, NodeKind::Reservoir(reservoir))
    }

    pub fn add_tank(&mut self, name: impl Into<String>, tank: Tank) -> NodeId {
        self.push_node(name, NodeKind::Tank(tank))
    }

    /// Add a pipe between two existing nodes. Flow is positive from `from` to `to`.
    pub fn add_pipe(
        &mut self,
        name: impl Into<String>,
        from: NodeId,
        to: NodeId,
        pipe: Pipe,
    ) -> LinkId {
        let id = LinkId::from_index(self.links.len() as u32);
        self.links.push(Link {
            id,
            name: name.into(),
            from,
            to,
            pipe,
        });
        id
    }

    pub fn add_pattern(&mut self, name: impl Into<String>, multipliers: Vec<f64>) -> PatternId {
        let id = PatternId::from_index(self.patterns.len() as u32);
        self.patterns.push(Pattern {
            id,
            name: name.into(),
            multipliers,
        });
        id
    }

    pub fn set_times(&mut self, times: TimeOptions) {
        self.times = times;
    }

    /// Look up a node added earlier by name.
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.name == name).map(|n| n.id)
    }

    pub fn pattern_id(&self, name: &str) -> Option<PatternId> {
        self.patterns.iter().find(|p| p.name == name).map(|p| p.id)
    }

    /// Validate and freeze the network.
    pub fn build(self) -> NetworkResult<Network> {
        validate::validate_structure(&self.nodes, &self.links, &self.patterns, &self.times)?;

        let (node_link_offsets, node_links) = Self::build_adjacency(&self.nodes, &self.links);

        validate::validate_connectivity(&self.nodes, &self.links, &node_link_offsets, &node_links)?;

        Ok(Network {
            nodes: self.nodes,
            links: self.links,
            patterns: self.patterns,
            times: self.times,
            node_link_offsets,
            node_links,
        })
    }

    fn build_adjacency(nodes: &[Node], links: &[Link]) -> (Vec<usize>, Vec<LinkId>) {
        let mut node_to_links: HashMap<NodeId, Vec<LinkId>> = HashMap::new();
        for link in links {
            node_to_links.entry(link.from).or_default().push(link.id);
            node_to_links.entry(link.to).or_default().push(link.id);
        }

        for list in node_to_links.values_mut() {
            list.sort_by_key(|l| l.index());
        }

        let mut offsets = Vec::with_capacity(nodes.len() + 1);
        let mut flat = Vec::new();
        offsets.push(0);
        for node in nodes {
            if let Some(list) = node_to_links.get(&node.id) {
                flat.extend_from_slice(list);
            }
            offsets.push(flat.len());
        }

        (offsets, flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wl_core::{lps, m, mm};

    #[test]
    fn builder_assigns_sequential_ids() {
        let mut b = NetworkBuilder::new();
        let r = b.add_reservoir("R", Reservoir::new(m(50.0)));
        let j = b.add_junction("J", Junction::new(m(0.0), lps(1.0)));
        let p = b.add_pipe("P", r, j, Pipe::new(m(100.0), mm(150.0), 130.0));
        assert_eq!(r.index(), 0);
        assert_eq!(j.index(), 1);
        assert_eq!(p.index(), 0);
        assert_eq!(b.node_id("J"), Some(j));
        assert_eq!(b.node_id("X"), None);
    }

    #[test]
    fn build_computes_adjacency() {
        let mut b = NetworkBuilder::new();
        let r = b.add_reservoir("R", Reservoir::new(m(50.0)));
        let j1 = b.add_junction("J1", Junction::new(m(0.0), lps(1.0)));
        let j2 = b.add_junction("J2", Junction::new(m(0.0), lps(1.0)));
        b.add_pipe("P1", r, j1, Pipe::new(m(100.0), mm(150.0), 130.0));
        b.add_pipe("P2", j1, j2, Pipe::new(m(100.0), mm(150.0), 130.0));
        let net = b.build().unwrap();
        assert_eq!(net.node_links(r).len(), 1);
        assert_eq!(net.node_links(j1).len(), 2);
        assert_eq!(net.node_links(j2).len(), 1);
        assert_eq!(net.junction_count(), 2);
    }
}
