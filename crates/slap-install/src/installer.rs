//! Installing dependencies into a Python environment.
//!
//! [`PipInstaller`] turns a list of [`Dependency`] values into a single
//! `python -m pip install` invocation. Path dependencies marked `link` are
//! not passed to pip; their own dependencies are installed instead and the
//! project is handed to a [`Linker`] once pip succeeds.

use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use slap_python::{Dependency, DependencyKind, PythonEnvironment, filter_dependencies, select_alternative, test_dependency};

use crate::error::{Error, Result};
use crate::indexes::{Indexes, redact_credentials};

/// Options for a single install operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOptions {
    pub indexes: Indexes,
    pub quiet: bool,
    pub upgrade: bool,
}

/// Installs dependencies into a Python environment.
pub trait Installer {
    /// Install `dependencies` into `target` and return the installer's exit
    /// status unchanged.
    fn install(&self, dependencies: &[Dependency], target: &PythonEnvironment, options: &InstallOptions) -> Result<i32>;
}

/// Links a local project into an environment instead of installing it.
pub trait Linker {
    /// Dependencies declared by the project at `project`.
    fn dependencies_for_project(&self, project: &Path) -> Result<Vec<Dependency>>;

    /// Make the project at `project` importable from the environment.
    fn link_project(&self, project: &Path) -> Result<()>;
}

/// The work an install operation will perform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipPlan {
    /// Arguments following `python -m pip install`.
    pub arguments: Vec<String>,
    /// Projects to link after pip succeeded, in encounter order.
    pub link: Vec<PathBuf>,
}

impl PipPlan {
    /// Whether pip has anything to install.
    pub fn has_requirements(&self) -> bool {
        !self.arguments.is_empty()
    }

    /// The full pip command line for `executable`.
    pub fn command_line(&self, executable: &Path, options: &InstallOptions) -> Result<Vec<String>> {
        let mut command = vec![
            executable.display().to_string(),
            "-m".to_string(),
            "pip".to_string(),
            "install".to_string(),
        ];
        command.extend(self.arguments.iter().cloned());
        command.extend(options.indexes.pip_arguments()?);
        if options.upgrade {
            command.push("--upgrade".to_string());
        }
        if options.quiet {
            command.push("--quiet".to_string());
        }
        Ok(command)
    }
}

/// Installs dependencies with pip.
pub struct PipInstaller<L> {
    linker: L,
    venv_check: bool,
}

impl<L: Linker> PipInstaller<L> {
    pub fn new(linker: L) -> Self {
        Self {
            linker,
            venv_check: false,
        }
    }

    /// Refuse to install into interpreters that are not virtual environments.
    pub fn with_venv_check(mut self, enabled: bool) -> Self {
        self.venv_check = enabled;
        self
    }

    pub fn linker(&self) -> &L {
        &self.linker
    }

    /// Work out the pip arguments and projects to link for `dependencies`
    /// without running anything.
    ///
    /// Dependencies that do not apply to `target` are dropped, alternatives
    /// are replaced by their applicable option and linked projects pull in
    /// their own dependencies.
    pub fn plan(&self, dependencies: &[Dependency], target: &PythonEnvironment) -> Result<PipPlan> {
        let env = target.pep508();
        let no_extras = BTreeSet::new();
        let mut plan = PipPlan::default();
        let mut queue: VecDeque<Dependency> = dependencies.iter().cloned().collect();
        let mut linked: BTreeSet<PathBuf> = BTreeSet::new();

        while let Some(dependency) = queue.pop_front() {
            if !test_dependency(&dependency, env, Some(&no_extras))? {
                tracing::debug!(dependency = %dependency, "skipping dependency not applicable to target");
                continue;
            }

            match &dependency.kind {
                DependencyKind::Alternatives(_) => {
                    match select_alternative(&dependency, env, Some(&no_extras))? {
                        Some(selected) => queue.push_front(selected.clone()),
                        None => tracing::debug!(dependency = %dependency.name, "no alternative applies"),
                    }
                }
                DependencyKind::Path { path, link: true, .. } => {
                    if !path.is_dir() {
                        return Err(Error::Link {
                            project: path.clone(),
                            reason: "not a directory".to_string(),
                        });
                    }
                    if !linked.insert(path.clone()) {
                        continue;
                    }
                    tracing::info!(project = %path.display(), "collecting dependencies of linked project");
                    let extras: BTreeSet<String> = dependency.extras.iter().cloned().collect();
                    let project_dependencies = self.linker.dependencies_for_project(path)?;
                    // Markers were evaluated with the project's extras.
                    queue.extend(
                        filter_dependencies(&project_dependencies, env, Some(&extras))?
                            .into_iter()
                            .map(|mut dependency| {
                                dependency.markers = None;
                                dependency
                            }),
                    );
                    plan.link.push(path.clone());
                }
                _ => plan.arguments.extend(dependency_to_pip_arguments(&dependency)),
            }
        }

        Ok(plan)
    }
}

impl<L: Linker> Installer for PipInstaller<L> {
    fn install(&self, dependencies: &[Dependency], target: &PythonEnvironment, options: &InstallOptions) -> Result<i32> {
        if self.venv_check && !target.is_venv() {
            return Err(Error::NotAVirtualEnvironment {
                prefix: target.prefix().to_path_buf(),
            });
        }

        let plan = self.plan(dependencies, target)?;

        if plan.has_requirements() {
            let command = plan.command_line(target.executable(), options)?;
            let shown = command
                .iter()
                .map(|part| redact_credentials(part))
                .collect::<Vec<_>>()
                .join(" ");
            tracing::info!(command = %shown, "installing with pip");

            let status = Command::new(&command[0])
                .args(&command[1..])
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .map_err(|source| slap_python::Error::ProcessSpawn {
                    program: target.executable().to_path_buf(),
                    source,
                })?;

            // Killed by a signal.
            let code = status.code().unwrap_or(-1);
            if code != 0 {
                tracing::debug!(code, "pip failed, skipping links");
                return Ok(code);
            }
        } else {
            tracing::debug!("nothing to install with pip");
        }

        for project in &plan.link {
            tracing::info!(project = %project.display(), "linking project");
            self.linker.link_project(project)?;
        }

        Ok(0)
    }
}

/// Translate one dependency into pip command line arguments.
///
/// Alternatives and linked paths are resolved before this point and yield
/// no arguments.
pub fn dependency_to_pip_arguments(dependency: &Dependency) -> Vec<String> {
    let extras = if dependency.extras.is_empty() {
        String::new()
    } else {
        format!("[{}]", dependency.extras.join(","))
    };
    let name = &dependency.name;

    let mut arguments = Vec::new();
    let supports_hashes = match &dependency.kind {
        DependencyKind::Registry { version, source } => {
            if let Some(source) = source {
                tracing::warn!(
                    dependency = %name,
                    source = %source,
                    "pip cannot pin a package to an index, installing from the configured indexes"
                );
            }
            arguments.push(format!("{name}{extras}{}", version.to_range_string()));
            true
        }
        DependencyKind::Url { url } => {
            arguments.push(format!("{name}{extras} @ {url}"));
            true
        }
        DependencyKind::VersionControl { url, reference } => {
            let reference = reference
                .as_ref()
                .map(|reference| format!("@{}", reference.as_str()))
                .unwrap_or_default();
            arguments.push(format!("{name}{extras} @ git+{url}{reference}"));
            false
        }
        DependencyKind::Path { path, develop, .. } => {
            if *develop {
                arguments.push("-e".to_string());
            }
            let path = path.display().to_string();
            let prefix = if path.starts_with('/') || path.starts_with('.') { "" } else { "./" };
            arguments.push(format!("{prefix}{path}{extras}"));
            false
        }
        DependencyKind::Alternatives(_) => return arguments,
    };

    if supports_hashes {
        arguments.extend(dependency.hashes.iter().map(|hash| format!("--hash={hash}")));
    } else if !dependency.hashes.is_empty() {
        tracing::warn!(dependency = %name, "hashes are not supported for this kind of dependency, ignoring them");
    }
    arguments
}
