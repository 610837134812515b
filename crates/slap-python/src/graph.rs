//! Expanding declared dependencies into the graph of installed distributions.

use std::collections::{BTreeMap, BTreeSet};

use slap_graph::{DiGraph, topological_sort};

use crate::dependency::{Dependency, DependencyKind, parse_dependency_string};
use crate::environment::{DistributionMetadata, DistributionSource};
use crate::error::{Error, Result};
use crate::pep508::{Pep508Environment, select_alternative, test_dependency};

/// Installed distributions reachable from a set of declared dependencies.
///
/// All keys are canonical distribution names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributionGraph {
    /// Metadata of every resolved distribution.
    pub metadata: BTreeMap<String, DistributionMetadata>,
    /// For each distribution, the names it depends on.
    pub dependencies: BTreeMap<String, BTreeSet<String>>,
    /// Declared names without an installed distribution.
    pub missing: BTreeSet<String>,
}

impl DistributionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `other` into this graph.
    pub fn update(&mut self, other: DistributionGraph) {
        self.metadata.extend(other.metadata);
        for (name, dependencies) in other.dependencies {
            self.dependencies.entry(name).or_default().extend(dependencies);
        }
        self.missing.extend(other.missing);
    }

    /// Whether `name` was already resolved or found missing.
    pub fn contains(&self, name: &str) -> bool {
        self.metadata.contains_key(name) || self.missing.contains(name)
    }

    /// Order the resolved distributions so that each one comes after
    /// everything it depends on. Ties are broken by name.
    ///
    /// Missing distributions are not part of the order.
    pub fn install_order(&self) -> Result<Vec<String>> {
        let mut graph: DiGraph<&str, (), ()> = DiGraph::new();
        for name in self.metadata.keys() {
            graph.add_node(name.as_str(), ());
        }
        for (dependent, dependencies) in &self.dependencies {
            if !graph.contains_node(&dependent.as_str()) {
                continue;
            }
            for dependency in dependencies {
                if graph.contains_node(&dependency.as_str()) {
                    graph
                        .add_edge(dependency.as_str(), dependent.as_str(), ())
                        .map_err(|e| Error::Graph(e.to_string()))?;
                }
            }
        }

        let order = topological_sort(&graph, |a, b| a.cmp(b)).map_err(|e| Error::Graph(e.to_string()))?;
        Ok(order.into_iter().map(str::to_string).collect())
    }
}

/// Resolve `dependencies` against the distributions installed in `source`.
///
/// Dependencies that do not apply to the environment are skipped, and
/// alternatives are replaced by their applicable option. The graph
/// is expanded one layer at a time; each layer is fetched with a single
/// [`DistributionSource::get_distributions`] call for the names not found in
/// `cache`, and `cache` is updated with the results.
pub fn build_distribution_graph(
    source: &impl DistributionSource,
    dependencies: &[Dependency],
    cache: &mut BTreeMap<String, Option<DistributionMetadata>>,
) -> Result<DistributionGraph> {
    let env = source.pep508();
    let mut graph = DistributionGraph::new();

    let mut layer: BTreeSet<String> = BTreeSet::new();
    let mut requested: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for dependency in dependencies {
        if let Some((name, extras)) = declared(dependency, env) {
            requested.entry(name.clone()).or_default().extend(extras);
            layer.insert(name);
        }
    }

    while !layer.is_empty() {
        fetch_uncached(source, &layer, cache)?;

        let mut next = DistributionGraph::new();
        let mut discovered = BTreeSet::new();
        for name in &layer {
            let Some(metadata) = cache.get(name).cloned().flatten() else {
                next.missing.insert(name.clone());
                continue;
            };

            let extras: BTreeSet<String> = requested
                .get(name)
                .map(|wanted| wanted.intersection(&metadata.provides_extras).cloned().collect())
                .unwrap_or_default();
            let edges = next.dependencies.entry(name.clone()).or_default();

            for requirement in &metadata.requires_dist {
                let dependency = match parse_dependency_string(requirement) {
                    Ok(dependency) => dependency,
                    Err(e) => {
                        tracing::warn!(distribution = %name, requirement = %requirement, error = %e, "skipping unparseable requirement");
                        continue;
                    }
                };
                if !applies(&dependency, env, &extras) {
                    continue;
                }
                let dependency_name = dependency.canonical_name();
                if dependency_name == *name {
                    continue;
                }
                requested
                    .entry(dependency_name.clone())
                    .or_default()
                    .extend(dependency.extras.iter().cloned());
                edges.insert(dependency_name.clone());
                if !graph.contains(&dependency_name) && !layer.contains(&dependency_name) {
                    discovered.insert(dependency_name);
                }
            }
            next.metadata.insert(name.clone(), metadata);
        }

        graph.update(next);
        layer = discovered;
    }

    Ok(graph)
}

/// Canonical name and extras a declared dependency contributes, or `None`
/// if it does not apply to `env`. Alternatives contribute their applicable
/// option.
fn declared(dependency: &Dependency, env: &Pep508Environment) -> Option<(String, BTreeSet<String>)> {
    let extras: BTreeSet<String> = dependency.extras.iter().cloned().collect();
    if !applies(dependency, env, &extras) {
        return None;
    }
    if !matches!(dependency.kind, DependencyKind::Alternatives(_)) {
        return Some((dependency.canonical_name(), extras));
    }

    match select_alternative(dependency, env, Some(&extras)) {
        Ok(Some(selected)) => Some((
            selected.canonical_name(),
            extras.into_iter().chain(selected.extras.iter().cloned()).collect(),
        )),
        Ok(None) => {
            tracing::debug!(dependency = %dependency.name, "no alternative applies");
            None
        }
        Err(e) => {
            tracing::warn!(dependency = %dependency.name, error = %e, "cannot evaluate alternatives, including it");
            Some((dependency.canonical_name(), extras))
        }
    }
}

fn applies(dependency: &Dependency, env: &Pep508Environment, extras: &BTreeSet<String>) -> bool {
    match test_dependency(dependency, env, Some(extras)) {
        Ok(applies) => applies,
        Err(e) => {
            tracing::warn!(dependency = %dependency.name, error = %e, "cannot evaluate dependency, including it");
            true
        }
    }
}

fn fetch_uncached(
    source: &impl DistributionSource,
    names: &BTreeSet<String>,
    cache: &mut BTreeMap<String, Option<DistributionMetadata>>,
) -> Result<()> {
    let uncached: Vec<String> = names.iter().filter(|name| !cache.contains_key(*name)).cloned().collect();
    if uncached.is_empty() {
        return Ok(());
    }
    let fetched = source.get_distributions(&uncached)?;
    for name in uncached {
        let metadata = fetched.get(&name).cloned().flatten();
        cache.insert(name, metadata);
    }
    Ok(())
}
