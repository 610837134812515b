//! Install configuration from an `[install]` table.
//!
//! The table is read either from a standalone `slap.toml` or from
//! `[tool.slap.install]` in a `pyproject.toml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use slap_python::{Dependency, parse_dependencies};

use crate::error::{Error, Result};
use crate::indexes::{IndexSpec, Indexes};
use crate::installer::InstallOptions;

/// Interpreter used when neither the configuration nor `$PYTHON` names one.
pub const DEFAULT_PYTHON: &str = "python";

/// Settings for installing a project's dependencies.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct InstallConfig {
    /// Interpreter to install into.
    #[serde(default)]
    pub python: Option<String>,
    #[serde(default)]
    pub quiet: bool,
    #[serde(default)]
    pub upgrade: bool,
    /// Treat declared but uninstalled distributions as errors.
    #[serde(default)]
    pub strict: bool,
    /// Extras installed in development mode. All extras when unset.
    #[serde(default)]
    pub dev_extras: Option<Vec<String>>,
    /// Named groups of optional dependencies.
    #[serde(default)]
    pub extras: BTreeMap<String, toml::Value>,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceConfig>,
}

/// A package index entry, `[[install.source]]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl InstallConfig {
    /// Parse configuration text.
    ///
    /// Looks for `[tool.slap.install]` first and `[install]` second. A
    /// document without either table yields the default configuration.
    pub fn from_toml(text: &str) -> Result<Self> {
        let document: toml::Value = toml::from_str(text)?;
        let table = document
            .get("tool")
            .and_then(|tool| tool.get("slap"))
            .and_then(|slap| slap.get("install"))
            .or_else(|| document.get("install"));

        match table {
            Some(table) => Ok(table.clone().try_into()?),
            None => Ok(Self::default()),
        }
    }

    /// Read configuration from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ConfigNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        tracing::debug!(path = %path.display(), "loading install configuration");
        Self::from_toml(&text)
    }

    /// The interpreter to install into: the configured one, then `$PYTHON`,
    /// then [`DEFAULT_PYTHON`].
    pub fn python_executable(&self) -> PathBuf {
        self.python
            .clone()
            .or_else(|| std::env::var("PYTHON").ok().filter(|value| !value.is_empty()))
            .unwrap_or_else(|| DEFAULT_PYTHON.to_string())
            .into()
    }

    /// The configured package indexes, credentials embedded.
    pub fn indexes(&self) -> Result<Indexes> {
        let mut indexes = Indexes::new();
        for source in &self.sources {
            let spec = IndexSpec {
                name: source.name.clone(),
                url: source.url.clone(),
                username: source.username.clone(),
                password: source.password.clone(),
            };
            indexes.add_spec(&spec, source.default)?;
        }
        Ok(indexes)
    }

    pub fn install_options(&self) -> Result<InstallOptions> {
        Ok(InstallOptions {
            indexes: self.indexes()?,
            quiet: self.quiet,
            upgrade: self.upgrade,
        })
    }

    /// Dependencies of the extra called `name`.
    pub fn extra_dependencies(&self, name: &str) -> Result<Vec<Dependency>> {
        let value = self
            .extras
            .get(name)
            .ok_or_else(|| Error::UnknownExtra(name.to_string()))?;
        Ok(parse_dependencies(value)?)
    }

    /// Names of the extras to install in development mode.
    pub fn dev_extra_names(&self) -> Vec<String> {
        match &self.dev_extras {
            Some(names) => names.clone(),
            None => self.extras.keys().cloned().collect(),
        }
    }
}
