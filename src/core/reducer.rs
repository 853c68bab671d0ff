//! Resource subsetting: dependency closure and graph pruning.
//!
//! The closure grows from the requested names to a fixed point over the
//! predecessor and colocation relations. The pruned graph is always a
//! subgraph of the input: nothing is introduced, only removed.

use super::types::*;
use crate::error::{Error, Result};
use indexmap::IndexSet;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info};

/// Which relations pull resources into a closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ClosurePolicy {
    /// Predecessor and colocation links in both directions
    #[default]
    Undirected,
    /// Only each member's own `predecessors` / `colocation` sets
    Dependencies,
}

/// Adjacency over the closure relation, in document order.
fn neighbors(graph: &ResourceGraph, policy: ClosurePolicy) -> HashMap<&str, Vec<&str>> {
    let mut adj: HashMap<&str, Vec<&str>> = graph
        .resources
        .keys()
        .map(|id| (id.as_str(), Vec::new()))
        .collect();

    for (id, resource) in &graph.resources {
        let deps = resource
            .dependencies
            .predecessors
            .iter()
            .chain(resource.dependencies.colocation.iter());
        for dep in deps {
            if let Some(list) = adj.get_mut(id.as_str()) {
                list.push(dep.as_str());
            }
            if policy == ClosurePolicy::Undirected {
                if let Some(list) = adj.get_mut(dep.as_str()) {
                    list.push(id.as_str());
                }
            }
        }
    }
    adj
}

/// Compute the closure of `targets`. Every target must be a resource.
///
/// Members are returned in discovery order (targets first).
pub fn closure(
    graph: &ResourceGraph,
    targets: &IndexSet<String>,
    policy: ClosurePolicy,
) -> Result<IndexSet<String>> {
    for name in targets {
        if !graph.resources.contains_key(name) {
            return Err(Error::UnknownResource(name.clone()));
        }
    }

    let adj = neighbors(graph, policy);
    let mut members: IndexSet<String> = targets.clone();
    let mut queue: VecDeque<&str> = targets.iter().map(|s| s.as_str()).collect();

    while let Some(current) = queue.pop_front() {
        for &next in adj.get(current).map(Vec::as_slice).unwrap_or_default() {
            if members.insert(next.to_string()) {
                queue.push_back(next);
            }
        }
    }

    debug!(
        requested = targets.len(),
        members = members.len(),
        "computed resource closure"
    );
    Ok(members)
}

/// Restrict a graph to the closure of `targets`.
///
/// An empty target set (or `None`) returns the input unchanged.
pub fn reduce(
    graph: &ResourceGraph,
    targets: Option<&IndexSet<String>>,
    policy: ClosurePolicy,
) -> Result<ResourceGraph> {
    let targets = match targets {
        Some(t) if !t.is_empty() => t,
        _ => return Ok(graph.clone()),
    };

    let keep = closure(graph, targets, policy)?;
    let inside = |name: &str| keep.contains(name);

    let reduced = ResourceGraph {
        resources: graph
            .resources
            .iter()
            .filter(|(id, _)| inside(id.as_str()))
            .map(|(id, r)| (id.clone(), r.clone()))
            .collect(),
        predecessor_edges: graph
            .predecessor_edges
            .iter()
            .filter(|e| e.within(inside))
            .cloned()
            .collect(),
        colocation_edges: graph
            .colocation_edges
            .iter()
            .filter(|e| e.within(inside))
            .cloned()
            .collect(),
        isolated_resources: graph
            .isolated_resources
            .iter()
            .filter(|id| inside(id.as_str()))
            .cloned()
            .collect(),
    };

    info!(
        kept = reduced.resources.len(),
        dropped = graph.resources.len() - reduced.resources.len(),
        "reduced graph to resource subset"
    );
    Ok(reduced)
}

/// Split a whitespace-separated resource list (`"a b  c"`).
pub fn parse_subset(list: &str) -> IndexSet<String> {
    list.split_whitespace().map(str::to_string).collect()
}
