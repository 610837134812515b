//! Generic directed graph with incrementally maintained root/leaf sets and a
//! deterministic, wave-based topological sort.
//!
//! # Example
//!
//! ```
//! use slap_graph::{DiGraph, topological_sort};
//!
//! let mut graph: DiGraph<&str, (), ()> = DiGraph::new();
//! graph.add_node("setuptools", ());
//! graph.add_node("wheel", ());
//! graph.add_node("myproject", ());
//! graph.add_edge("setuptools", "myproject", ()).unwrap();
//! graph.add_edge("wheel", "myproject", ()).unwrap();
//!
//! let order = topological_sort(&graph, |a, b| a.cmp(b)).unwrap();
//! assert_eq!(order, vec!["setuptools", "wheel", "myproject"]);
//! ```

pub mod digraph;
pub mod error;
pub mod sort;

pub use digraph::DiGraph;
pub use error::{Error, Result};
pub use sort::topological_sort;
