#![cfg(unix)]

use std::collections::BTreeMap;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use slap_python::{Error, PythonEnvironment, build_distribution_graph};
use slap_test_utils::python::FakePython;

#[test]
fn test_introspect_reads_environment_report() {
    let python = FakePython::new().with_python_version("3.8.10");
    let env = PythonEnvironment::introspect(python.executable()).unwrap();

    assert_eq!(env.executable(), python.executable());
    assert_eq!(env.pep508().python_version, "3.8");
    assert_eq!(env.pep508().python_full_version, "3.8.10");
    assert_eq!(env.pep508().platform_python_implementation, "CPython");
    assert!(env.is_venv());
    assert_eq!(python.calls(), vec!["environment"]);
}

#[test]
fn test_system_interpreter_is_not_a_venv() {
    let python = FakePython::new().without_venv();
    let env = PythonEnvironment::introspect(python.executable()).unwrap();
    assert!(!env.is_venv());
}

#[test]
fn test_of_memoizes_per_executable() {
    let python = FakePython::new();
    let first = PythonEnvironment::of(python.executable()).unwrap();
    let second = PythonEnvironment::of(python.executable()).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(python.calls(), vec!["environment"]);
}

#[test]
fn test_protocol_mismatch_is_rejected() {
    let python = FakePython::new().with_protocol(2);
    let err = PythonEnvironment::introspect(python.executable()).unwrap_err();
    assert!(matches!(err, Error::Protocol { .. }), "{err}");
}

#[test]
fn test_garbage_output_is_rejected() {
    let python = FakePython::new().with_raw_environment("Traceback (most recent call last):");
    let err = PythonEnvironment::introspect(python.executable()).unwrap_err();
    assert!(matches!(err, Error::Protocol { .. }), "{err}");
}

#[test]
fn test_missing_executable() {
    let python = FakePython::new();
    let err = PythonEnvironment::introspect(python.root().join("nope")).unwrap_err();
    assert!(matches!(err, Error::ExecutableNotFound { .. }), "{err}");
}

#[test]
fn test_get_distributions_batches_and_caches() {
    let python = FakePython::new()
        .with_distribution("requests", "2.31.0", &["idna>=2.5"])
        .with_distribution("idna", "3.4", &[]);
    let env = PythonEnvironment::introspect(python.executable()).unwrap();

    let first = env.get_distributions(&["requests", "idna", "missing"]).unwrap();
    assert_eq!(first["requests"].as_ref().unwrap().version, "2.31.0");
    assert_eq!(first["idna"].as_ref().unwrap().requires_dist, Vec::<String>::new());
    assert!(first["missing"].is_none());

    let second = env.get_distributions(&["requests", "idna", "missing"]).unwrap();
    assert_eq!(first, second);
    assert_eq!(python.distribution_queries(), 1);

    // Only the new name is queried; lookups go through canonical names.
    let third = env.get_distributions(&["Requests", "urllib3"]).unwrap();
    assert_eq!(third["Requests"].as_ref().unwrap().name, "requests");
    assert_eq!(python.calls().last().unwrap(), "distributions urllib3");
}

#[test]
fn test_distribution_location_and_extras() {
    let python = FakePython::new().with_distribution_metadata(
        "my_project",
        json!({
            "name": "my-project",
            "version": "0.1.0",
            "location": "/src/my-project",
            "requires_dist": ["mkdocs; extra == 'docs'"],
            "provides_extras": ["docs"],
        }),
    );
    let env = PythonEnvironment::introspect(python.executable()).unwrap();
    let metadata = env.get_distribution("my-project").unwrap().unwrap();
    assert_eq!(metadata.location.unwrap().to_str(), Some("/src/my-project"));
    assert!(metadata.provides_extras.contains("docs"));
}

#[test]
fn test_graph_against_fake_interpreter() {
    let python = FakePython::new()
        .with_distribution("app", "1.0", &["requests>=2", "colorama; sys_platform == 'win32'"])
        .with_distribution("requests", "2.31.0", &["idna>=2.5", "urllib3<3"])
        .with_distribution("idna", "3.4", &[])
        .with_distribution("urllib3", "2.0.7", &[]);
    let env = PythonEnvironment::introspect(python.executable()).unwrap();

    let dependencies = vec!["app".parse().unwrap()];
    let mut cache = BTreeMap::new();
    let graph = build_distribution_graph(&env, &dependencies, &mut cache).unwrap();

    assert_eq!(graph.install_order().unwrap(), vec!["idna", "urllib3", "requests", "app"]);
    assert!(graph.missing.is_empty());
    // One query per layer: app, requests, {idna, urllib3}.
    assert_eq!(python.distribution_queries(), 3);
}
