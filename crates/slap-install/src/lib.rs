//! Installing Python dependencies into an environment with pip.
//!
//! # Example
//!
//! ```rust,no_run
//! use slap_install::{InstallConfig, Installer, PipInstaller};
//! use slap_python::PythonEnvironment;
//!
//! # struct NoLinks;
//! # impl slap_install::Linker for NoLinks {
//! #     fn dependencies_for_project(&self, _: &std::path::Path) -> slap_install::Result<Vec<slap_python::Dependency>> { Ok(Vec::new()) }
//! #     fn link_project(&self, _: &std::path::Path) -> slap_install::Result<()> { Ok(()) }
//! # }
//! # fn main() -> slap_install::Result<()> {
//! let config = InstallConfig::load("slap.toml")?;
//! let python = PythonEnvironment::of(config.python_executable())?;
//! let dependencies = config.extra_dependencies("docs")?;
//!
//! let installer = PipInstaller::new(NoLinks).with_venv_check(true);
//! let code = installer.install(&dependencies, &python, &config.install_options()?)?;
//! std::process::exit(code);
//! # }
//! ```

pub mod config;
pub mod error;
pub mod indexes;
pub mod installer;
pub mod logging;
pub mod plan;

pub use config::{DEFAULT_PYTHON, InstallConfig, SourceConfig};
pub use error::{Error, Result};
pub use indexes::{IndexSpec, Indexes, redact_credentials};
pub use installer::{InstallOptions, Installer, Linker, PipInstaller, PipPlan, dependency_to_pip_arguments};
pub use plan::{ResolutionPlan, resolve};
