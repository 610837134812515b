use proptest::prelude::*;
use slap_graph::{DiGraph, Error, topological_sort};

/// Builds a graph over `0..size` from `(a, b)` pairs. Edges only ever point
/// from a lower to a higher id, so the result is acyclic.
fn acyclic_graph(size: usize, pairs: &[(usize, usize)]) -> DiGraph<usize, (), ()> {
    let mut graph = DiGraph::new();
    for id in 0..size {
        graph.add_node(id, ());
    }
    for &(a, b) in pairs {
        let (a, b) = (a % size, b % size);
        if a < b {
            graph.add_edge(a, b, ()).unwrap();
        }
    }
    graph
}

proptest! {
    #[test]
    fn test_every_node_once_and_edges_respected(
        size in 1usize..24,
        pairs in prop::collection::vec((0usize..24, 0usize..24), 0..64),
    ) {
        let graph = acyclic_graph(size, &pairs);
        let order = topological_sort(&graph, |a, b| a.cmp(b)).unwrap();

        prop_assert_eq!(order.len(), size);
        let mut position = vec![usize::MAX; size];
        for (index, id) in order.iter().enumerate() {
            prop_assert_eq!(position[*id], usize::MAX, "node {} emitted twice", id);
            position[*id] = index;
        }
        for (from, to, _) in graph.edges() {
            prop_assert!(position[*from] < position[*to]);
        }
    }

    #[test]
    fn test_back_edge_is_reported_as_cycle(
        size in 2usize..16,
        pairs in prop::collection::vec((0usize..16, 0usize..16), 0..32),
    ) {
        let mut graph = acyclic_graph(size, &pairs);
        // Close a loop through the chain 0 -> 1 -> ... -> size-1 -> 0.
        for id in 1..size {
            graph.add_edge(id - 1, id, ()).unwrap();
        }
        graph.add_edge(size - 1, 0, ()).unwrap();

        match topological_sort(&graph, |a, b| a.cmp(b)) {
            Err(Error::Cycle { unreached }) => prop_assert!(unreached.contains(&0)),
            other => prop_assert!(false, "expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_order_is_deterministic(
        size in 1usize..16,
        pairs in prop::collection::vec((0usize..16, 0usize..16), 0..32),
    ) {
        let graph = acyclic_graph(size, &pairs);
        let first = topological_sort(&graph, |a, b| a.cmp(b)).unwrap();
        let second = topological_sort(&graph.clone(), |a, b| a.cmp(b)).unwrap();
        prop_assert_eq!(first, second);
    }
}
