//! Start order over predecessor edges.
//!
//! Uses Kahn's algorithm with alphabetical tie-breaking so the same graph
//! always yields the same order. Generation itself does not depend on this:
//! ordering reaches the cluster as explicit order constraints.

use super::types::ResourceGraph;
use crate::error::{Error, Result};
use std::collections::{BTreeSet, HashMap};

/// Compute a start order honoring every predecessor edge.
pub fn start_order(graph: &ResourceGraph) -> Result<Vec<String>> {
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();

    for id in graph.resources.keys() {
        in_degree.insert(id.as_str(), 0);
        adjacency.insert(id.as_str(), Vec::new());
    }

    for edge in &graph.predecessor_edges {
        let (from, to) = (edge.0.as_str(), edge.1.as_str());
        match (adjacency.get_mut(from), in_degree.get_mut(to)) {
            (Some(next), Some(degree)) => {
                next.push(to);
                *degree += 1;
            }
            _ => {
                return Err(Error::malformed(format!(
                    "order edge {} references unknown resource",
                    edge
                )))
            }
        }
    }

    // BTreeSet doubles as a sorted ready queue
    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut order = Vec::with_capacity(in_degree.len());
    while let Some(current) = ready.pop_first() {
        order.push(current.to_string());
        for &neighbor in adjacency.get(current).map(Vec::as_slice).unwrap_or_default() {
            if let Some(degree) = in_degree.get_mut(neighbor) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(neighbor);
                }
            }
        }
    }

    if order.len() != graph.resources.len() {
        let mut cycle_members: Vec<&str> = in_degree
            .iter()
            .filter(|(_, &d)| d > 0)
            .map(|(&id, _)| id)
            .collect();
        cycle_members.sort_unstable();
        return Err(Error::malformed(format!(
            "ordering cycle detected involving: {}",
            cycle_members.join(", ")
        )));
    }

    Ok(order)
}
