//! Contiguous junction indexing.
//!
//! The leak-localization core addresses candidate nodes as `0..N` where `N`
//! is the junction count. Reservoirs and tanks are not candidates.

use wl_core::NodeId;

use crate::error::{NetworkError, NetworkResult};
use crate::network::Network;

/// Bidirectional map between junction positions `0..N` and network node IDs.
#[derive(Debug, Clone)]
pub struct JunctionIndex {
    node_ids: Vec<NodeId>,
    names: Vec<String>,
    /// Reverse lookup sized to the node count; None for non-junctions.
    node_to_idx: Vec<Option<usize>>,
}

impl JunctionIndex {
    pub fn from_network(net: &Network) -> Self {
        let mut node_ids = Vec::new();
        let mut names = Vec::new();
        let mut node_to_idx = vec![None; net.nodes().len()];
        for node in net.nodes().iter().filter(|n| n.is_junction()) {
            node_to_idx[node.id.idx()] = Some(node_ids.len());
            node_ids.push(node.id);
            names.push(node.name.clone());
        }
        Self {
            node_ids,
            names,
            node_to_idx,
        }
    }

    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    pub fn node_id(&self, idx: usize) -> Option<NodeId> {
        self.node_ids.get(idx).copied()
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.node_to_idx.get(id.idx()).copied().flatten()
    }

    pub fn name(&self, idx: usize) -> Option<&str> {
        self.names.get(idx).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn index_of_name(&self, name: &str) -> NetworkResult<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| NetworkError::NotFound {
                what: "junction",
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Junction, NetworkBuilder, Pipe, Reservoir};
    use wl_core::{lps, m, mm};

    #[test]
    fn skips_fixed_head_nodes() {
        let mut b = NetworkBuilder::new();
        let j1 = b.add_junction("J1", Junction::new(m(0.0), lps(1.0)));
        let r = b.add_reservoir("R", Reservoir::new(m(30.0)));
        let j2 = b.add_junction("J2", Junction::new(m(0.0), lps(1.0)));
        b.add_pipe("P1", r, j1, Pipe::new(m(10.0), mm(100.0), 100.0));
        b.add_pipe("P2", j1, j2, Pipe::new(m(10.0), mm(100.0), 100.0));
        let net = b.build().unwrap();

        let idx = JunctionIndex::from_network(&net);
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.index_of(j1), Some(0));
        assert_eq!(idx.index_of(j2), Some(1));
        assert_eq!(idx.index_of(r), None);
        assert_eq!(idx.name(1), Some("J2"));
        assert_eq!(idx.index_of_name("J2").unwrap(), 1);
        assert!(idx.index_of_name("R").is_err());
    }
}
