//! The [`DiGraph`] container.
//!
//! Nodes are keyed by `K` and carry a value `N`; edges are keyed by the
//! ordered pair `(from, to)` and carry a value `E`. The graph owns all of its
//! data, so views are plain borrows and cannot outlive it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
struct Node<K, N> {
    value: N,
    predecessors: BTreeSet<K>,
    successors: BTreeSet<K>,
}

/// A directed graph.
///
/// `roots` (nodes without incoming edges) and `leafs` (nodes without
/// outgoing edges) are kept up to date on every mutation.
#[derive(Debug, Clone)]
pub struct DiGraph<K, N, E> {
    nodes: BTreeMap<K, Node<K, N>>,
    edges: BTreeMap<(K, K), E>,
    roots: BTreeSet<K>,
    leafs: BTreeSet<K>,
}

impl<K, N, E> Default for DiGraph<K, N, E> {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            roots: BTreeSet::new(),
            leafs: BTreeSet::new(),
        }
    }
}

impl<K, N, E> DiGraph<K, N, E>
where
    K: Ord + Clone + Debug,
{
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, or replace the value of an existing node while keeping
    /// its edges. Returns the previous value, if any.
    ///
    /// A new node starts out as both a root and a leaf.
    pub fn add_node(&mut self, id: K, value: N) -> Option<N> {
        if let Some(node) = self.nodes.get_mut(&id) {
            return Some(std::mem::replace(&mut node.value, value));
        }
        self.roots.insert(id.clone());
        self.leafs.insert(id.clone());
        self.nodes.insert(
            id,
            Node {
                value,
                predecessors: BTreeSet::new(),
                successors: BTreeSet::new(),
            },
        );
        None
    }

    /// Add (or overwrite) the edge `from -> to`. Both nodes must exist.
    ///
    /// Returns the previous edge value, if the edge already existed.
    pub fn add_edge(&mut self, from: K, to: K, value: E) -> Result<Option<E>, K> {
        if !self.nodes.contains_key(&from) {
            return Err(Error::UnknownNode(from));
        }
        if !self.nodes.contains_key(&to) {
            return Err(Error::UnknownNode(to));
        }

        if let Some(node) = self.nodes.get_mut(&from) {
            node.successors.insert(to.clone());
        }
        if let Some(node) = self.nodes.get_mut(&to) {
            node.predecessors.insert(from.clone());
        }
        self.leafs.remove(&from);
        self.roots.remove(&to);
        Ok(self.edges.insert((from, to), value))
    }

    /// Remove a node together with all incident edges and return its value.
    ///
    /// Former neighbours that lose their last incoming (outgoing) edge become
    /// roots (leafs) again.
    pub fn remove_node(&mut self, id: &K) -> Result<N, K> {
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| Error::UnknownNode(id.clone()))?;

        for pred in &node.predecessors {
            self.edges.remove(&(pred.clone(), id.clone()));
            if let Some(pred_node) = self.nodes.get_mut(pred) {
                pred_node.successors.remove(id);
                if pred_node.successors.is_empty() {
                    self.leafs.insert(pred.clone());
                }
            }
        }
        for succ in &node.successors {
            self.edges.remove(&(id.clone(), succ.clone()));
            if let Some(succ_node) = self.nodes.get_mut(succ) {
                succ_node.predecessors.remove(id);
                if succ_node.predecessors.is_empty() {
                    self.roots.insert(succ.clone());
                }
            }
        }

        self.roots.remove(id);
        self.leafs.remove(id);
        Ok(node.value)
    }

    /// Remove the edge `from -> to` and return its value.
    pub fn remove_edge(&mut self, from: &K, to: &K) -> Result<E, K> {
        let value = self
            .edges
            .remove(&(from.clone(), to.clone()))
            .ok_or_else(|| Error::UnknownEdge(from.clone(), to.clone()))?;

        if let Some(node) = self.nodes.get_mut(from) {
            node.successors.remove(to);
            if node.successors.is_empty() {
                self.leafs.insert(from.clone());
            }
        }
        if let Some(node) = self.nodes.get_mut(to) {
            node.predecessors.remove(from);
            if node.predecessors.is_empty() {
                self.roots.insert(to.clone());
            }
        }
        Ok(value)
    }

    pub fn contains_node(&self, id: &K) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn contains_edge(&self, from: &K, to: &K) -> bool {
        self.edges.contains_key(&(from.clone(), to.clone()))
    }

    /// Borrow the value of a node.
    pub fn node(&self, id: &K) -> Result<&N, K> {
        self.nodes
            .get(id)
            .map(|node| &node.value)
            .ok_or_else(|| Error::UnknownNode(id.clone()))
    }

    /// Mutably borrow the value of a node.
    pub fn node_mut(&mut self, id: &K) -> Result<&mut N, K> {
        self.nodes
            .get_mut(id)
            .map(|node| &mut node.value)
            .ok_or_else(|| Error::UnknownNode(id.clone()))
    }

    /// Borrow the value of an edge.
    pub fn edge(&self, from: &K, to: &K) -> Result<&E, K> {
        self.edges
            .get(&(from.clone(), to.clone()))
            .ok_or_else(|| Error::UnknownEdge(from.clone(), to.clone()))
    }

    /// Iterate over `(id, value)` pairs in key order.
    pub fn nodes(&self) -> impl Iterator<Item = (&K, &N)> {
        self.nodes.iter().map(|(id, node)| (id, &node.value))
    }

    /// Iterate over `(from, to, value)` triples in key order.
    pub fn edges(&self) -> impl Iterator<Item = (&K, &K, &E)> {
        self.edges.iter().map(|((from, to), value)| (from, to, value))
    }

    /// Nodes without predecessors.
    pub fn roots(&self) -> impl Iterator<Item = &K> {
        self.roots.iter()
    }

    /// Nodes without successors.
    pub fn leafs(&self) -> impl Iterator<Item = &K> {
        self.leafs.iter()
    }

    pub fn predecessors(&self, id: &K) -> Result<impl Iterator<Item = &K>, K> {
        self.nodes
            .get(id)
            .map(|node| node.predecessors.iter())
            .ok_or_else(|| Error::UnknownNode(id.clone()))
    }

    pub fn successors(&self, id: &K) -> Result<impl Iterator<Item = &K>, K> {
        self.nodes
            .get(id)
            .map(|node| node.successors.iter())
            .ok_or_else(|| Error::UnknownNode(id.clone()))
    }

    pub(crate) fn in_degree(&self, id: &K) -> usize {
        self.nodes
            .get(id)
            .map_or(0, |node| node.predecessors.len())
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roots(graph: &DiGraph<&'static str, u32, ()>) -> Vec<&'static str> {
        graph.roots().copied().collect()
    }

    fn leafs(graph: &DiGraph<&'static str, u32, ()>) -> Vec<&'static str> {
        graph.leafs().copied().collect()
    }

    #[test]
    fn test_new_node_is_root_and_leaf() {
        let mut graph = DiGraph::new();
        graph.add_node("a", 1);
        assert_eq!(roots(&graph), vec!["a"]);
        assert_eq!(leafs(&graph), vec!["a"]);
    }

    #[test]
    fn test_add_node_replaces_value_keeps_edges() {
        let mut graph = DiGraph::new();
        graph.add_node("a", 1);
        graph.add_node("b", 2);
        graph.add_edge("a", "b", ()).unwrap();

        assert_eq!(graph.add_node("a", 10), Some(1));
        assert_eq!(*graph.node(&"a").unwrap(), 10);
        assert!(graph.contains_edge(&"a", &"b"));
        assert_eq!(roots(&graph), vec!["a"]);
        assert_eq!(leafs(&graph), vec!["b"]);
    }

    #[test]
    fn test_add_edge_requires_both_nodes() {
        let mut graph: DiGraph<&str, u32, ()> = DiGraph::new();
        graph.add_node("a", 1);
        let err = graph.add_edge("a", "missing", ()).unwrap_err();
        assert!(matches!(err, Error::UnknownNode("missing")));
        let err = graph.add_edge("missing", "a", ()).unwrap_err();
        assert!(matches!(err, Error::UnknownNode("missing")));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_add_edge_updates_roots_and_leafs() {
        let mut graph = DiGraph::new();
        graph.add_node("a", 1);
        graph.add_node("b", 2);
        graph.add_node("c", 3);
        graph.add_edge("a", "b", ()).unwrap();
        graph.add_edge("b", "c", ()).unwrap();

        assert_eq!(roots(&graph), vec!["a"]);
        assert_eq!(leafs(&graph), vec!["c"]);
    }

    #[test]
    fn test_add_edge_overwrites_value() {
        let mut graph: DiGraph<&str, (), &str> = DiGraph::new();
        graph.add_node("a", ());
        graph.add_node("b", ());
        assert_eq!(graph.add_edge("a", "b", "first").unwrap(), None);
        assert_eq!(graph.add_edge("a", "b", "second").unwrap(), Some("first"));
        assert_eq!(*graph.edge(&"a", &"b").unwrap(), "second");
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_remove_node_restores_neighbour_membership() {
        let mut graph = DiGraph::new();
        graph.add_node("a", 1);
        graph.add_node("b", 2);
        graph.add_node("c", 3);
        graph.add_edge("a", "b", ()).unwrap();
        graph.add_edge("b", "c", ()).unwrap();

        assert_eq!(graph.remove_node(&"b").unwrap(), 2);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(roots(&graph), vec!["a", "c"]);
        assert_eq!(leafs(&graph), vec!["a", "c"]);
        assert_eq!(graph.successors(&"a").unwrap().count(), 0);
        assert_eq!(graph.predecessors(&"c").unwrap().count(), 0);
    }

    #[test]
    fn test_remove_node_keeps_other_edges() {
        let mut graph = DiGraph::new();
        graph.add_node("a", 1);
        graph.add_node("b", 2);
        graph.add_node("c", 3);
        graph.add_edge("a", "b", ()).unwrap();
        graph.add_edge("a", "c", ()).unwrap();

        graph.remove_node(&"b").unwrap();
        // `a` still has an outgoing edge, so it must not become a leaf.
        assert_eq!(leafs(&graph), vec!["c"]);
        assert!(graph.contains_edge(&"a", &"c"));
    }

    #[test]
    fn test_remove_unknown_node() {
        let mut graph: DiGraph<&str, u32, ()> = DiGraph::new();
        assert!(matches!(
            graph.remove_node(&"nope"),
            Err(Error::UnknownNode("nope"))
        ));
    }

    #[test]
    fn test_remove_edge() {
        let mut graph = DiGraph::new();
        graph.add_node("a", 1);
        graph.add_node("b", 2);
        graph.add_edge("a", "b", ()).unwrap();

        graph.remove_edge(&"a", &"b").unwrap();
        assert_eq!(roots(&graph), vec!["a", "b"]);
        assert_eq!(leafs(&graph), vec!["a", "b"]);
        assert!(matches!(
            graph.remove_edge(&"a", &"b"),
            Err(Error::UnknownEdge("a", "b"))
        ));
    }

    #[test]
    fn test_node_mut() {
        let mut graph: DiGraph<&str, u32, ()> = DiGraph::new();
        graph.add_node("a", 1);
        *graph.node_mut(&"a").unwrap() += 41;
        assert_eq!(*graph.node(&"a").unwrap(), 42);
        assert!(graph.node_mut(&"b").is_err());
    }
}
