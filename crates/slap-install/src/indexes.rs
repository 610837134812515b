//! Named package indexes.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Named package index locations and which one is the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indexes {
    /// Name of the index that replaces PyPI.
    pub default: Option<String>,
    pub urls: BTreeMap<String, String>,
}

impl Indexes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Register an index, optionally making it the default.
    pub fn add(&mut self, name: impl Into<String>, url: impl Into<String>, default: bool) {
        let name = name.into();
        if default {
            self.default = Some(name.clone());
        }
        self.urls.insert(name, url.into());
    }

    /// Register the index described by `spec`, with its credentials
    /// embedded in the URL.
    pub fn add_spec(&mut self, spec: &IndexSpec, default: bool) -> Result<()> {
        let url = spec.url_with_credentials()?;
        self.add(spec.name.clone(), url, default);
        Ok(())
    }

    /// Collect indexes from Poetry `[[tool.poetry.source]]` entries.
    pub fn from_poetry_sources(sources: &toml::Value) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidIndexSpec {
            spec: sources.to_string(),
            reason,
        };
        let entries = sources
            .as_array()
            .ok_or_else(|| invalid("expected an array of sources".to_string()))?;

        let mut indexes = Self::new();
        for entry in entries {
            let name = entry
                .get("name")
                .and_then(toml::Value::as_str)
                .ok_or_else(|| invalid("source is missing 'name'".to_string()))?;
            let url = entry
                .get("url")
                .and_then(toml::Value::as_str)
                .ok_or_else(|| invalid(format!("source '{name}' is missing 'url'")))?;
            let default = entry
                .get("default")
                .and_then(toml::Value::as_bool)
                .unwrap_or(false);
            indexes.add(name, url, default);
        }
        Ok(indexes)
    }

    /// URL of the default index, if one is set.
    pub fn default_url(&self) -> Result<Option<&str>> {
        match &self.default {
            None => Ok(None),
            Some(name) => self
                .urls
                .get(name)
                .map(|url| Some(url.as_str()))
                .ok_or_else(|| Error::UnknownIndex(name.clone())),
        }
    }

    /// pip flags selecting these indexes: `--index-url` for the default and
    /// `--extra-index-url` for every other index, in name order.
    pub fn pip_arguments(&self) -> Result<Vec<String>> {
        let mut arguments = Vec::new();
        if let Some(url) = self.default_url()? {
            arguments.push("--index-url".to_string());
            arguments.push(url.to_string());
        }
        for (name, url) in &self.urls {
            if self.default.as_ref() != Some(name) {
                arguments.push("--extra-index-url".to_string());
                arguments.push(url.clone());
            }
        }
        Ok(arguments)
    }
}

/// A single index given as `name=NAME,url=URL[,username=USER,password=PASS]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl IndexSpec {
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidIndexSpec {
            spec: spec.to_string(),
            reason,
        };

        let mut fields: BTreeMap<&str, &str> = BTreeMap::new();
        for part in spec.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| invalid(format!("expected key=value, got '{part}'")))?;
            let key = key.trim();
            if !matches!(key, "name" | "url" | "username" | "password") {
                return Err(invalid(format!("unknown key '{key}'")));
            }
            if fields.insert(key, value.trim()).is_some() {
                return Err(invalid(format!("'{key}' is given more than once")));
            }
        }

        let required = |key: &str| {
            fields
                .get(key)
                .filter(|value| !value.is_empty())
                .map(|value| value.to_string())
                .ok_or_else(|| invalid(format!("missing '{key}'")))
        };
        let name = required("name")?;
        let url = required("url")?;
        let username = fields.get("username").map(|value| value.to_string());
        let password = fields.get("password").map(|value| value.to_string());

        if password.is_some() && username.is_none() {
            return Err(invalid("'password' requires 'username'".to_string()));
        }

        Ok(Self {
            name,
            url,
            username,
            password,
        })
    }

    /// The index URL with username and password embedded.
    pub fn url_with_credentials(&self) -> Result<String> {
        let invalid = |reason: String| Error::InvalidIndexSpec {
            spec: self.url.clone(),
            reason,
        };
        let Some(username) = &self.username else {
            return Ok(self.url.clone());
        };

        let mut url = Url::parse(&self.url).map_err(|e| invalid(e.to_string()))?;
        url.set_username(username)
            .map_err(|()| invalid("URL cannot carry credentials".to_string()))?;
        url.set_password(self.password.as_deref())
            .map_err(|()| invalid("URL cannot carry credentials".to_string()))?;
        Ok(url.to_string())
    }
}

impl FromStr for IndexSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for IndexSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "name={},url={}", self.name, self.url)?;
        if let Some(username) = &self.username {
            write!(f, ",username={username}")?;
        }
        if self.password.is_some() {
            f.write_str(",password=***")?;
        }
        Ok(())
    }
}

/// Mask the password of a URL for display. Anything that is not a URL with
/// a password is returned unchanged.
pub fn redact_credentials(value: &str) -> String {
    match Url::parse(value) {
        Ok(mut url) if url.password().is_some() => {
            if url.set_password(Some("***")).is_err() {
                return value.to_string();
            }
            url.to_string()
        }
        _ => value.to_string(),
    }
}
