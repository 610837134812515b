//! Resolving declared dependencies against an environment.

use std::collections::BTreeMap;

use slap_python::{Dependency, DistributionGraph, DistributionSource, build_distribution_graph};

use crate::error::{Error, Result};

/// The installed distributions behind a set of declared dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionPlan {
    pub graph: DistributionGraph,
    /// Resolved distributions, each after everything it depends on.
    pub order: Vec<String>,
}

impl ResolutionPlan {
    /// Canonical names of distributions that are declared but not
    /// installed.
    pub fn missing(&self) -> Vec<String> {
        self.graph.missing.iter().cloned().collect()
    }

    pub fn is_complete(&self) -> bool {
        self.graph.missing.is_empty()
    }
}

/// Build the distribution graph for `dependencies` and order it.
///
/// Missing distributions are logged, or reported as
/// [`Error::MissingDistributions`] when `strict` is set.
pub fn resolve(source: &impl DistributionSource, dependencies: &[Dependency], strict: bool) -> Result<ResolutionPlan> {
    let mut cache = BTreeMap::new();
    let graph = build_distribution_graph(source, dependencies, &mut cache)?;

    if !graph.missing.is_empty() {
        let names: Vec<String> = graph.missing.iter().cloned().collect();
        if strict {
            return Err(Error::MissingDistributions { names });
        }
        tracing::warn!(missing = %names.join(", "), "declared distributions are not installed");
    }

    let order = graph.install_order()?;
    tracing::debug!(distributions = order.len(), "resolved distribution graph");
    Ok(ResolutionPlan { graph, order })
}
