use std::path::PathBuf;

/// Errors that can occur while parsing, evaluating or resolving dependencies.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A dependency string or configuration could not be parsed.
    #[error("invalid dependency '{input}': {reason}")]
    InvalidDependency { input: String, reason: String },

    /// A `name[extra, ...]` expression is malformed.
    #[error("invalid package name with extras: '{input}'")]
    InvalidExtras { input: String },

    /// A concrete version string could not be parsed.
    #[error("invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    /// A version range expression could not be parsed.
    #[error("invalid version spec '{spec}': {reason}")]
    InvalidVersionSpec { spec: String, reason: String },

    /// An environment marker could not be parsed or evaluated.
    #[error("invalid environment marker '{marker}': {reason}")]
    InvalidMarker { marker: String, reason: String },

    /// A structured dependency configuration has an unexpected shape.
    #[error("cannot interpret dependency '{name}': {reason}")]
    InvalidConfig { name: String, reason: String },

    /// The Python executable could not be located.
    #[error("Python executable not found: {executable}")]
    ExecutableNotFound { executable: String },

    /// The external process could not be started.
    #[error("failed to run {program}: {source}")]
    ProcessSpawn {
        program: PathBuf,
        source: std::io::Error,
    },

    /// The external process exited with a non-zero status.
    #[error("{program} failed (exit code {code:?}): {stderr}")]
    ProcessFailed {
        program: PathBuf,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// The introspection script produced output that does not match the
    /// expected protocol.
    #[error("unexpected output from {program}: {reason}")]
    Protocol { program: PathBuf, reason: String },

    /// The distribution graph could not be ordered.
    #[error("distribution graph error: {0}")]
    Graph(String),
}

pub type Result<T> = std::result::Result<T, Error>;
