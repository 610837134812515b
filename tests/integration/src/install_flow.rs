//! End-to-end install flow: configuration -> introspection -> resolution -> pip.

#![cfg(unix)]

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use slap_install::{Error, InstallConfig, InstallOptions, Installer, Indexes, Linker, PipInstaller, resolve};
use slap_python::{Dependency, PythonEnvironment, parse_dependencies};
use slap_test_utils::python::FakePython;
use tempfile::TempDir;

struct NoLinks;

impl Linker for NoLinks {
    fn dependencies_for_project(&self, _project: &Path) -> slap_install::Result<Vec<Dependency>> {
        Ok(Vec::new())
    }

    fn link_project(&self, _project: &Path) -> slap_install::Result<()> {
        Ok(())
    }
}

/// Write a pyproject.toml that installs into `python`.
fn setup_project(python: &FakePython, strict: bool) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("pyproject.toml"),
        format!(
            r#"
[project]
name = "example"
dependencies = ["requests ^2.28", "pywin32; sys_platform == 'win32'"]

[tool.slap.install]
python = "{python}"
quiet = true
strict = {strict}
dev-extras = ["docs"]

[tool.slap.install.extras]
docs = ["mkdocs ^1.4"]
test = ["pytest >=7"]

[[tool.slap.install.source]]
name = "internal"
url = "https://pypi.internal/simple"
default = true
"#,
            python = python.executable().display(),
        ),
    )
    .unwrap();
    temp
}

fn project_dependencies(root: &Path) -> Vec<Dependency> {
    let text = fs::read_to_string(root.join("pyproject.toml")).unwrap();
    let document: toml::Value = toml::from_str(&text).unwrap();
    parse_dependencies(&document["project"]["dependencies"]).unwrap()
}

#[test]
fn test_configured_project_resolves_and_installs() {
    let python = FakePython::new()
        .with_distribution("requests", "2.31.0", &["urllib3 <3,>=1.21.1", "idna >=2.5"])
        .with_distribution("urllib3", "2.0.7", &[])
        .with_distribution("idna", "3.4", &[]);
    let project = setup_project(&python, false);

    let config = InstallConfig::load(project.path().join("pyproject.toml")).unwrap();
    let env = PythonEnvironment::of(config.python_executable()).unwrap();

    let mut dependencies = project_dependencies(project.path());
    for extra in config.dev_extra_names() {
        dependencies.extend(config.extra_dependencies(&extra).unwrap());
    }

    let plan = resolve(env.as_ref(), &dependencies, config.strict).unwrap();
    assert_eq!(plan.order, vec!["idna", "urllib3", "requests"]);
    assert_eq!(plan.missing(), vec!["mkdocs"]);

    let installer = PipInstaller::new(NoLinks).with_venv_check(true);
    let code = installer
        .install(&dependencies, &env, &config.install_options().unwrap())
        .unwrap();
    assert_eq!(code, 0);

    insta::assert_snapshot!(python.pip_args().join(" "), @"install requests>=2.28,<3.0 mkdocs>=1.4,<2.0 --index-url https://pypi.internal/simple --quiet");
    assert_eq!(
        python.calls()[..3],
        ["environment", "distributions mkdocs requests", "distributions idna urllib3"]
    );
}

#[test]
fn test_strict_project_with_missing_distribution_is_rejected() {
    let python = FakePython::new().with_distribution("requests", "2.31.0", &[]);
    let project = setup_project(&python, true);

    let config = InstallConfig::load(project.path().join("pyproject.toml")).unwrap();
    let env = PythonEnvironment::of(config.python_executable()).unwrap();
    let mut dependencies = project_dependencies(project.path());
    dependencies.extend(config.extra_dependencies("test").unwrap());

    let err = resolve(env.as_ref(), &dependencies, config.strict).unwrap_err();
    assert!(matches!(&err, Error::MissingDistributions { names } if names == &["pytest"]), "{err}");
}

#[test]
fn test_poetry_sources_select_indexes() {
    let python = FakePython::new();
    let env = PythonEnvironment::introspect(python.executable()).unwrap();
    let pyproject: toml::Value = toml::from_str(
        r#"
[tool.poetry.dependencies]
python = "^3.8"
requests = { version = "^2.28", extras = ["socks"] }
tomli = { version = "^2.0", python = "<3.11" }
pywin32 = { version = "*", markers = "sys_platform == 'win32'" }

[[tool.poetry.source]]
name = "mirror"
url = "https://mirror.internal/simple"
"#,
    )
    .unwrap();

    let poetry = &pyproject["tool"]["poetry"];
    let dependencies: Vec<Dependency> = parse_dependencies(&poetry["dependencies"])
        .unwrap()
        .into_iter()
        .filter(|dependency| dependency.name != "python")
        .collect();
    let options = InstallOptions {
        indexes: Indexes::from_poetry_sources(&poetry["source"]).unwrap(),
        ..Default::default()
    };

    let code = PipInstaller::new(NoLinks).install(&dependencies, &env, &options).unwrap();
    assert_eq!(code, 0);
    assert_eq!(
        python.pip_args(),
        vec![
            "install",
            "requests[socks]>=2.28,<3.0",
            "tomli>=2.0,<3.0",
            "--extra-index-url",
            "https://mirror.internal/simple",
        ]
    );
}
