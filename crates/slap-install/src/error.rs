use std::path::PathBuf;

/// Errors that can occur while configuring, resolving or installing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Parsing, introspection or resolution failed.
    #[error(transparent)]
    Python(#[from] slap_python::Error),

    /// A `name=...,url=...` index specification is malformed.
    #[error("invalid index spec '{spec}': {reason}")]
    InvalidIndexSpec { spec: String, reason: String },

    /// The default index names an index that is not configured.
    #[error("unknown package index: {0}")]
    UnknownIndex(String),

    /// An extra was requested that the configuration does not define.
    #[error("unknown extra: {0}")]
    UnknownExtra(String),

    /// Failed to parse the install configuration.
    #[error("failed to parse install configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration file does not exist.
    #[error("install configuration not found: {0}")]
    ConfigNotFound(PathBuf),

    /// I/O error reading configuration or running pip.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Strict resolution found declared distributions that are not installed.
    #[error("distributions not installed: {}", names.join(", "))]
    MissingDistributions { names: Vec<String> },

    /// A project could not be linked into the environment.
    #[error("cannot link project {project}: {reason}")]
    Link { project: PathBuf, reason: String },

    /// Refusing to install into an interpreter outside a virtual environment.
    #[error("refusing to install into {prefix}: not a virtual environment")]
    NotAVirtualEnvironment { prefix: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;
