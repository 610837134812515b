//! Evaluating dependencies against a target interpreter's PEP 508 fields.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::dependency::{Dependency, DependencyKind};
use crate::error::{Error, Result};
use crate::marker::{MarkerTree, MarkerVariable};

/// The PEP 508 environment of a Python interpreter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pep508Environment {
    pub python_version: String,
    pub python_full_version: String,
    pub os_name: String,
    pub sys_platform: String,
    pub platform_release: String,
    pub platform_system: String,
    pub platform_machine: String,
    pub platform_python_implementation: String,
    pub implementation_name: String,
    pub implementation_version: String,
}

impl Pep508Environment {
    /// Value of a single marker variable.
    pub fn get(&self, variable: MarkerVariable) -> &str {
        match variable {
            MarkerVariable::PythonVersion => &self.python_version,
            MarkerVariable::PythonFullVersion => &self.python_full_version,
            MarkerVariable::OsName => &self.os_name,
            MarkerVariable::SysPlatform => &self.sys_platform,
            MarkerVariable::PlatformRelease => &self.platform_release,
            MarkerVariable::PlatformSystem => &self.platform_system,
            MarkerVariable::PlatformMachine => &self.platform_machine,
            MarkerVariable::PlatformPythonImplementation => &self.platform_python_implementation,
            MarkerVariable::ImplementationName => &self.implementation_name,
            MarkerVariable::ImplementationVersion => &self.implementation_version,
        }
    }

    /// Parse and evaluate `markers` in this environment.
    ///
    /// With `extras` set to `None`, markers that mention `extra` fail.
    pub fn evaluate_markers(&self, markers: &str, extras: Option<&BTreeSet<String>>) -> Result<bool> {
        MarkerTree::parse(markers)?.evaluate(self, extras)
    }
}

/// Check whether `dependency` applies to `env`.
///
/// The dependency's Python constraint is tested against the environment's
/// `python_version` and its markers are evaluated with `extras`.
pub fn test_dependency(
    dependency: &Dependency,
    env: &Pep508Environment,
    extras: Option<&BTreeSet<String>>,
) -> Result<bool> {
    if let Some(python) = &dependency.python {
        if !python.accepts(&env.python_version)? {
            return Ok(false);
        }
    }

    match &dependency.markers {
        Some(markers) => env.evaluate_markers(markers, extras),
        None => Ok(true),
    }
}

/// Keep only the dependencies that apply to `env`.
///
/// Evaluation errors are propagated.
pub fn filter_dependencies(
    dependencies: &[Dependency],
    env: &Pep508Environment,
    extras: Option<&BTreeSet<String>>,
) -> Result<Vec<Dependency>> {
    let mut selected = Vec::with_capacity(dependencies.len());
    for dependency in dependencies {
        if test_dependency(dependency, env, extras)? {
            selected.push(dependency.clone());
        }
    }
    Ok(selected)
}

/// Pick the first applicable alternative of an
/// [`DependencyKind::Alternatives`] dependency.
///
/// Returns `Ok(None)` if no alternative applies. A warning is logged when
/// more than one alternative matches.
pub fn select_alternative<'a>(
    dependency: &'a Dependency,
    env: &Pep508Environment,
    extras: Option<&BTreeSet<String>>,
) -> Result<Option<&'a Dependency>> {
    let DependencyKind::Alternatives(alternatives) = &dependency.kind else {
        return Err(Error::InvalidDependency {
            input: dependency.name.clone(),
            reason: "not a dependency with alternatives".to_string(),
        });
    };

    let mut matching = Vec::new();
    for alternative in alternatives {
        if test_dependency(alternative, env, extras)? {
            matching.push(alternative);
        }
    }

    if matching.len() > 1 {
        tracing::warn!(
            dependency = %dependency.name,
            matches = matching.len(),
            "multiple alternatives apply, using the first"
        );
    }

    Ok(matching.first().copied())
}
