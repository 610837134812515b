//! Python dependency declarations, environment markers and distribution
//! graphs.
//!
//! ```
//! use slap_python::{Dependency, DependencyKind, VersionSpec};
//!
//! let dependency = Dependency::parse("requests[socks] ^2.28; python_version >= '3.8'").unwrap();
//! assert_eq!(dependency.name, "requests");
//! assert_eq!(dependency.extras, vec!["socks"]);
//! match &dependency.kind {
//!     DependencyKind::Registry { version, .. } => assert_eq!(*version, ">=2.28,<3.0"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! assert!(VersionSpec::parse("^2.28").unwrap().accepts("2.31.0").unwrap());
//! ```

pub mod dependency;
pub mod environment;
pub mod error;
pub mod graph;
pub mod marker;
pub mod pep508;
pub mod process;
pub mod version;

pub use dependency::{
    Dependency, DependencyKind, GitRef, canonicalize_name, parse_dependencies, parse_dependency_config,
    parse_dependency_string, split_package_name_with_extras,
};
pub use environment::{DistributionMetadata, DistributionSource, PROTOCOL_VERSION, PythonEnvironment};
pub use error::{Error, Result};
pub use graph::{DistributionGraph, build_distribution_graph};
pub use marker::{CompareOp, MarkerExpression, MarkerOperand, MarkerTree, MarkerVariable};
pub use pep508::{Pep508Environment, filter_dependencies, select_alternative, test_dependency};
pub use process::resolve_executable;
pub use version::{Operator, Specifier, Version, VersionSpec};
