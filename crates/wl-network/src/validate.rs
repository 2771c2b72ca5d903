//! Network validation.

use std::collections::{HashSet, VecDeque};
use wl_core::{LinkId, meters};

use crate::error::{NetworkError, NetworkResult};
use crate::network::{Link, Node, NodeKind, Pattern, TimeOptions};

fn invalid(entity: &str, field: &'static str, reason: impl Into<String>) -> NetworkError {
    NetworkError::InvalidValue {
        entity: entity.to_string(),
        field,
        reason: reason.into(),
    }
}

fn check_positive(entity: &str, field: &'static str, v: f64) -> NetworkResult<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(invalid(entity, field, format!("must be positive and finite, got {v}")))
    }
}

fn check_finite(entity: &str, field: &'static str, v: f64) -> NetworkResult<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(invalid(entity, field, format!("must be finite, got {v}")))
    }
}

pub(crate) fn validate_structure(
    nodes: &[Node],
    links: &[Link],
    patterns: &[Pattern],
    times: &TimeOptions,
) -> NetworkResult<()> {
    let mut names = HashSet::new();
    for node in nodes {
        if !names.insert(node.name.as_str()) {
            return Err(NetworkError::DuplicateName {
                what: "node",
                name: node.name.clone(),
            });
        }
        let pattern = match &node.kind {
            NodeKind::Junction(j) => {
                check_finite(&node.name, "elevation", meters(j.elevation))?;
                check_finite(&node.name, "base_demand", j.base_demand.value)?;
                if !(j.emitter.is_finite() && j.emitter >= 0.0) {
                    return Err(invalid(&node.name, "emitter", "must be non-negative"));
                }
                j.pattern
            }
            NodeKind::Reservoir(r) => {
                check_finite(&node.name, "head", meters(r.head))?;
                r.pattern
            }
            NodeKind::Tank(t) => {
                check_finite(&node.name, "elevation", meters(t.elevation))?;
                check_positive(&node.name, "diameter", meters(t.diameter))?;
                let (min, init, max) = (
                    meters(t.min_level),
                    meters(t.init_level),
                    meters(t.max_level),
                );
                if !(min >= 0.0 && min <= init && init <= max) {
                    return Err(invalid(
                        &node.name,
                        "init_level",
                        format!("levels must satisfy 0 <= min <= init <= max ({min}, {init}, {max})"),
                    ));
                }
                None
            }
        };
        if let Some(p) = pattern
            && p.idx() >= patterns.len()
        {
            return Err(NetworkError::UnknownPattern {
                node: node.name.clone(),
                pattern: p.idx(),
            });
        }
    }

    let mut link_names = HashSet::new();
    for link in links {
        if !link_names.insert(link.name.as_str()) {
            return Err(NetworkError::DuplicateName {
                what: "pipe",
                name: link.name.clone(),
            });
        }
        for end in [link.from, link.to] {
            if end.idx() >= nodes.len() {
                return Err(NetworkError::InvalidNodeRef {
                    link: link.name.clone(),
                    node: end.idx(),
                });
            }
        }
        if link.from == link.to {
            return Err(NetworkError::SelfLoop {
                link: link.name.clone(),
                node: nodes[link.from.idx()].name.clone(),
            });
        }
        check_positive(&link.name, "length", meters(link.pipe.length))?;
        check_positive(&link.name, "diameter", meters(link.pipe.diameter))?;
        check_positive(&link.name, "roughness", link.pipe.roughness)?;
    }

    let mut pattern_names = HashSet::new();
    for p in patterns {
        if !pattern_names.insert(p.name.as_str()) {
            return Err(NetworkError::DuplicateName {
                what: "pattern",
                name: p.name.clone(),
            });
        }
        if p.multipliers.iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err(invalid(&p.name, "multipliers", "must be finite and non-negative"));
        }
    }

    check_positive("times", "duration", times.duration_s())?;
    check_positive("times", "hydraulic_step", times.hydraulic_step_s())?;
    check_positive("times", "pattern_step", times.pattern_step_s())?;

    if !nodes.iter().any(Node::is_junction) {
        return Err(NetworkError::NoJunctions);
    }
    if !nodes.iter().any(Node::is_fixed_head) {
        return Err(NetworkError::NoFixedHead);
    }
    Ok(())
}

/// Every junction must reach a fixed-head node, otherwise its head is undefined.
pub(crate) fn validate_connectivity(
    nodes: &[Node],
    links: &[Link],
    offsets: &[usize],
    node_links: &[LinkId],
) -> NetworkResult<()> {
    let mut reached = vec![false; nodes.len()];
    let mut queue = VecDeque::new();
    for node in nodes.iter().filter(|n| n.is_fixed_head()) {
        reached[node.id.idx()] = true;
        queue.push_back(node.id.idx());
    }

    while let Some(i) = queue.pop_front() {
        for link_id in &node_links[offsets[i]..offsets[i + 1]] {
            let link = &links[link_id.idx()];
            let other = if link.from.idx() == i {
                link.to.idx()
            } else {
                link.from.idx()
            };
            if !reached[other] {
                reached[other] = true;
                queue.push_back(other);
            }
        }
    }

    match nodes.iter().find(|n| !reached[n.id.idx()]) {
        Some(n) => Err(NetworkError::Disconnected {
            node: n.name.clone(),
        }),
        None => Ok(()),
    }
}
