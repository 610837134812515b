//! Shared test utilities for the slap workspace.
//!
//! This crate is a dev-dependency only and is never published.
//!
//! # Modules
//!
//! - [`python`]: [`FakePython`](python::FakePython), a shell script that
//!   answers the interpreter introspection protocol and records every call

#[cfg(unix)]
pub mod python;
