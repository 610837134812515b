use std::fmt::Debug;

/// Errors raised by [`DiGraph`](crate::DiGraph) operations.
#[derive(Debug, thiserror::Error)]
pub enum Error<K: Debug> {
    /// The referenced node is not part of the graph.
    #[error("unknown node: {0:?}")]
    UnknownNode(K),

    /// The referenced edge is not part of the graph.
    #[error("unknown edge: {0:?} -> {1:?}")]
    UnknownEdge(K, K),

    /// The graph contains a cycle; `unreached` lists the nodes that could not
    /// be ordered.
    #[error("cycle detected, unreached nodes: {unreached:?}")]
    Cycle { unreached: Vec<K> },
}

pub type Result<T, K> = std::result::Result<T, Error<K>>;
