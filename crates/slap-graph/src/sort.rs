//! Wave-based topological ordering.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use crate::digraph::DiGraph;
use crate::error::{Error, Result};

/// Order the nodes of `graph` so that every edge `a -> b` has `a` before `b`.
///
/// Nodes are emitted in waves: the first wave is the graph's roots, and a
/// node joins the next wave once all of its predecessors were emitted. Nodes
/// within a wave are ordered with `tie_break`.
///
/// # Errors
///
/// Returns [`Error::Cycle`] with the nodes that could never be reached when
/// the graph contains a cycle.
pub fn topological_sort<K, N, E, F>(graph: &DiGraph<K, N, E>, mut tie_break: F) -> Result<Vec<K>, K>
where
    K: Ord + Clone + Debug,
    F: FnMut(&K, &K) -> Ordering,
{
    let mut pending: BTreeMap<&K, usize> = graph
        .nodes()
        .map(|(id, _)| (id, graph.in_degree(id)))
        .collect();

    let mut wave: Vec<&K> = graph.roots().collect();
    wave.sort_by(|a, b| tie_break(a, b));

    let mut order = Vec::with_capacity(graph.len());
    let mut emitted: BTreeSet<&K> = BTreeSet::new();

    while !wave.is_empty() {
        let mut next = Vec::new();
        for id in wave {
            emitted.insert(id);
            order.push(id.clone());

            for succ in graph.successors(id)? {
                if let Some(remaining) = pending.get_mut(succ) {
                    *remaining = remaining.saturating_sub(1);
                    if *remaining == 0 {
                        next.push(succ);
                    }
                }
            }
        }
        next.sort_by(|a, b| tie_break(a, b));
        wave = next;
    }

    if order.len() != graph.len() {
        let unreached = graph
            .nodes()
            .map(|(id, _)| id)
            .filter(|id| !emitted.contains(id))
            .cloned()
            .collect();
        return Err(Error::Cycle { unreached });
    }

    Ok(order)
}
