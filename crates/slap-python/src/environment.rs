//! Introspecting a Python interpreter through a subprocess.
//!
//! The interpreter runs one of the bootstrap scripts in `bootstrap/` and
//! answers with a single JSON document. Results are cached: environments
//! per executable path, distribution metadata per environment.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::dependency::canonicalize_name;
use crate::error::{Error, Result};
use crate::pep508::Pep508Environment;
use crate::process::{resolve_executable, run_script};

/// Version of the JSON protocol spoken by the bootstrap scripts.
pub const PROTOCOL_VERSION: u32 = 1;

const ENVIRONMENT_SCRIPT: &str = include_str!("bootstrap/environment.py");
const DISTRIBUTIONS_SCRIPT: &str = include_str!("bootstrap/distributions.py");

static ENVIRONMENTS: LazyLock<Mutex<HashMap<PathBuf, Arc<PythonEnvironment>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Metadata of an installed distribution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionMetadata {
    pub name: String,
    pub version: String,
    /// Source directory for local (path) installs.
    #[serde(default)]
    pub location: Option<PathBuf>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub requires_python: Option<String>,
    /// Raw `Requires-Dist` strings.
    #[serde(default)]
    pub requires_dist: Vec<String>,
    #[serde(default)]
    pub provides_extras: BTreeSet<String>,
}

/// Anything that can describe a target environment and its installed
/// distributions.
pub trait DistributionSource {
    /// The environment markers are evaluated against.
    fn pep508(&self) -> &Pep508Environment;

    /// Look up installed distributions. The result has one entry per
    /// requested name, `None` when the distribution is not installed.
    fn get_distributions(&self, names: &[String]) -> Result<BTreeMap<String, Option<DistributionMetadata>>>;
}

#[derive(Debug, Deserialize)]
struct EnvironmentReport {
    protocol: u32,
    executable: Option<PathBuf>,
    version: String,
    platform: String,
    prefix: PathBuf,
    base_prefix: Option<PathBuf>,
    real_prefix: Option<PathBuf>,
    pep508: Pep508Environment,
}

/// A Python installation.
#[derive(Debug)]
pub struct PythonEnvironment {
    executable: PathBuf,
    sys_executable: Option<PathBuf>,
    version: String,
    platform: String,
    prefix: PathBuf,
    base_prefix: Option<PathBuf>,
    real_prefix: Option<PathBuf>,
    pep508: Pep508Environment,
    distributions: Mutex<HashMap<String, Option<DistributionMetadata>>>,
}

impl PythonEnvironment {
    /// Introspect `executable`, reusing an earlier result for the same path.
    ///
    /// The interpreter is only invoked the first time a path is seen during
    /// the lifetime of the process.
    pub fn of(executable: impl AsRef<Path>) -> Result<Arc<Self>> {
        let executable = resolve_executable(executable.as_ref())?;
        let mut environments = ENVIRONMENTS.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(environment) = environments.get(&executable) {
            tracing::debug!(executable = %executable.display(), "environment cache hit");
            return Ok(Arc::clone(environment));
        }
        let environment = Arc::new(Self::introspect_resolved(executable.clone())?);
        environments.insert(executable, Arc::clone(&environment));
        Ok(environment)
    }

    /// Introspect `executable` without consulting the process-wide cache.
    pub fn introspect(executable: impl AsRef<Path>) -> Result<Self> {
        Self::introspect_resolved(resolve_executable(executable.as_ref())?)
    }

    fn introspect_resolved(executable: PathBuf) -> Result<Self> {
        let stdout = run_script::<&str>(&executable, ENVIRONMENT_SCRIPT, &[])?;
        let line = stdout.lines().rev().find(|line| !line.trim().is_empty()).unwrap_or_default();
        let report: EnvironmentReport = serde_json::from_str(line).map_err(|e| Error::Protocol {
            program: executable.clone(),
            reason: format!("cannot decode environment report: {e}"),
        })?;

        if report.protocol != PROTOCOL_VERSION {
            return Err(Error::Protocol {
                program: executable,
                reason: format!(
                    "expected protocol version {PROTOCOL_VERSION}, got {}",
                    report.protocol
                ),
            });
        }

        tracing::debug!(
            executable = %executable.display(),
            python_version = %report.pep508.python_version,
            "introspected python environment"
        );

        Ok(Self {
            executable,
            sys_executable: report.executable,
            version: report.version,
            platform: report.platform,
            prefix: report.prefix,
            base_prefix: report.base_prefix,
            real_prefix: report.real_prefix,
            pep508: report.pep508,
            distributions: Mutex::new(HashMap::new()),
        })
    }

    /// The path used to invoke the interpreter.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// `sys.executable` as reported by the interpreter.
    pub fn sys_executable(&self) -> Option<&Path> {
        self.sys_executable.as_deref()
    }

    /// `sys.version`
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn base_prefix(&self) -> Option<&Path> {
        self.base_prefix.as_deref()
    }

    pub fn real_prefix(&self) -> Option<&Path> {
        self.real_prefix.as_deref()
    }

    pub fn pep508(&self) -> &Pep508Environment {
        &self.pep508
    }

    /// Whether this is a virtual environment.
    pub fn is_venv(&self) -> bool {
        self.real_prefix.is_some()
            || self
                .base_prefix
                .as_ref()
                .is_some_and(|base_prefix| *base_prefix != self.prefix)
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, Option<DistributionMetadata>>> {
        self.distributions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a single distribution.
    pub fn get_distribution(&self, name: &str) -> Result<Option<DistributionMetadata>> {
        Ok(self.get_distributions(&[name])?.remove(name).flatten())
    }

    /// Look up several distributions with at most one subprocess call.
    ///
    /// Names are cached in canonical form, so only names never queried
    /// before on this environment are sent to the interpreter.
    pub fn get_distributions<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<BTreeMap<String, Option<DistributionMetadata>>> {
        let mut cache = self.cache();

        let mut pending: Vec<&str> = Vec::new();
        let mut pending_keys = BTreeSet::new();
        for name in names.iter().map(AsRef::as_ref) {
            let key = canonicalize_name(name);
            if !cache.contains_key(&key) && pending_keys.insert(key) {
                pending.push(name);
            }
        }

        if pending.is_empty() {
            tracing::debug!(count = names.len(), "distribution cache hit");
        } else {
            let fetched = self.query_distributions(&pending)?;
            for (name, metadata) in pending.iter().zip(fetched) {
                cache.insert(canonicalize_name(name), metadata);
            }
        }

        Ok(names
            .iter()
            .map(AsRef::as_ref)
            .map(|name| {
                let metadata = cache.get(&canonicalize_name(name)).cloned().flatten();
                (name.to_string(), metadata)
            })
            .collect())
    }

    fn query_distributions(&self, names: &[&str]) -> Result<Vec<Option<DistributionMetadata>>> {
        let stdout = run_script(&self.executable, DISTRIBUTIONS_SCRIPT, names)?;
        let line = stdout.lines().rev().find(|line| !line.trim().is_empty()).unwrap_or_default();
        let fetched: Vec<Option<DistributionMetadata>> =
            serde_json::from_str(line).map_err(|e| Error::Protocol {
                program: self.executable.clone(),
                reason: format!("cannot decode distribution metadata: {e}"),
            })?;

        if fetched.len() != names.len() {
            return Err(Error::Protocol {
                program: self.executable.clone(),
                reason: format!(
                    "requested {} distributions, received {}",
                    names.len(),
                    fetched.len()
                ),
            });
        }
        Ok(fetched)
    }
}

impl DistributionSource for PythonEnvironment {
    fn pep508(&self) -> &Pep508Environment {
        &self.pep508
    }

    fn get_distributions(&self, names: &[String]) -> Result<BTreeMap<String, Option<DistributionMetadata>>> {
        PythonEnvironment::get_distributions(self, names)
    }
}
