//! [`FakePython`]: a stand-in interpreter for subprocess tests.
//!
//! The fake is a POSIX shell script. It recognizes the bootstrap scripts by
//! their `# slap:<kind>` tag line and `-m pip` invocations, answers from JSON
//! files in its directory, and appends one line per invocation to
//! `calls.log`.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::TempDir;

const SCRIPT: &str = r#"#!/bin/sh
root='@ROOT@'
case "$2" in
  '# slap:environment'*)
    echo environment >> "$root/calls.log"
    cat "$root/environment.json"
    ;;
  '# slap:distributions'*)
    shift 2
    echo "distributions $*" >> "$root/calls.log"
    printf '['
    sep=''
    for name in "$@"; do
      key=$(printf '%s' "$name" | tr 'A-Z' 'a-z' | sed 's/[-_.][-_.]*/-/g')
      printf '%s' "$sep"
      if [ -f "$root/dists/$key.json" ]; then cat "$root/dists/$key.json"; else printf 'null'; fi
      sep=','
    done
    printf ']\n'
    ;;
  *)
    if [ "$1" = "-m" ] && [ "$2" = "pip" ]; then
      shift 2
      echo "pip $*" >> "$root/calls.log"
      : > "$root/pip_args"
      for arg in "$@"; do printf '%s\n' "$arg" >> "$root/pip_args"; done
      exit "$(cat "$root/pip_exit_code")"
    fi
    echo "unexpected invocation: $*" >&2
    exit 2
    ;;
esac
"#;

/// A fake Python interpreter in a temporary directory.
///
/// # Example
///
/// ```rust,no_run
/// use slap_test_utils::python::FakePython;
///
/// let python = FakePython::new().with_distribution("requests", "2.31.0", &["idna>=2.5"]);
/// // ... run code against python.executable() ...
/// assert_eq!(python.calls(), vec!["environment".to_string()]);
/// ```
pub struct FakePython {
    dir: TempDir,
    environment: Value,
}

impl Default for FakePython {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePython {
    /// A CPython 3.10 virtual environment on Linux with nothing installed.
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("bin")).unwrap();
        fs::create_dir_all(root.join("dists")).unwrap();
        fs::write(root.join("calls.log"), "").unwrap();
        fs::write(root.join("pip_exit_code"), "0").unwrap();

        let script_path = root.join("bin").join("python");
        let script = SCRIPT.replace("@ROOT@", &root.display().to_string());
        fs::write(&script_path, script).unwrap();
        fs::set_permissions(&script_path, fs::Permissions::from_mode(0o755)).unwrap();

        let environment = json!({
            "protocol": 1,
            "executable": script_path.display().to_string(),
            "version": "3.10.2 (main, Jan 15 2022, 18:02:07) [GCC 11.1.0]",
            "platform": "Linux-5.15.0-x86_64-with-glibc2.35",
            "prefix": root.join("venv").display().to_string(),
            "base_prefix": "/usr",
            "real_prefix": null,
            "pep508": {
                "python_version": "3.10",
                "python_full_version": "3.10.2",
                "os_name": "posix",
                "sys_platform": "linux",
                "platform_release": "5.15.0",
                "platform_system": "Linux",
                "platform_machine": "x86_64",
                "platform_python_implementation": "CPython",
                "implementation_name": "cpython",
                "implementation_version": "3.10.2",
            },
        });

        let python = Self { dir, environment };
        python.write_environment();
        python
    }

    /// The directory holding the fake's state.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the interpreter script.
    pub fn executable(&self) -> PathBuf {
        self.root().join("bin").join("python")
    }

    fn write_environment(&self) {
        fs::write(
            self.root().join("environment.json"),
            serde_json::to_string(&self.environment).unwrap(),
        )
        .unwrap();
    }

    /// Report `version` (e.g. `3.8.10`) as the interpreter version.
    pub fn with_python_version(mut self, version: &str) -> Self {
        let short = version.split('.').take(2).collect::<Vec<_>>().join(".");
        self.environment["pep508"]["python_version"] = json!(short);
        self.environment["pep508"]["python_full_version"] = json!(version);
        self.environment["pep508"]["implementation_version"] = json!(version);
        self.write_environment();
        self
    }

    /// Override a single PEP 508 field.
    pub fn with_marker(mut self, variable: &str, value: &str) -> Self {
        self.environment["pep508"][variable] = json!(value);
        self.write_environment();
        self
    }

    /// Report a system interpreter rather than a virtual environment.
    pub fn without_venv(mut self) -> Self {
        self.environment["prefix"] = json!("/usr");
        self.environment["base_prefix"] = json!("/usr");
        self.environment["real_prefix"] = Value::Null;
        self.write_environment();
        self
    }

    /// Report a different protocol version.
    pub fn with_protocol(mut self, protocol: u32) -> Self {
        self.environment["protocol"] = json!(protocol);
        self.write_environment();
        self
    }

    /// Replace the environment report with arbitrary text.
    pub fn with_raw_environment(self, text: &str) -> Self {
        fs::write(self.root().join("environment.json"), text).unwrap();
        self
    }

    /// Install a distribution with the given `Requires-Dist` entries.
    pub fn with_distribution(self, name: &str, version: &str, requires: &[&str]) -> Self {
        self.with_distribution_metadata(
            name,
            json!({
                "name": name,
                "version": version,
                "location": null,
                "license": null,
                "platform": null,
                "requires_python": null,
                "requires_dist": requires,
                "provides_extras": [],
            }),
        )
    }

    /// Install a distribution with explicit metadata, as the distributions
    /// bootstrap script would report it.
    pub fn with_distribution_metadata(self, name: &str, metadata: Value) -> Self {
        fs::write(
            self.root().join("dists").join(format!("{}.json", canonical(name))),
            serde_json::to_string(&metadata).unwrap(),
        )
        .unwrap();
        self
    }

    /// Exit code of the next `-m pip` invocations.
    pub fn with_pip_exit_code(self, code: i32) -> Self {
        fs::write(self.root().join("pip_exit_code"), code.to_string()).unwrap();
        self
    }

    /// One entry per invocation: `environment`, `distributions <names>` or
    /// `pip <args>`.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.root().join("calls.log"))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Number of invocations that queried distributions.
    pub fn distribution_queries(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with("distributions"))
            .count()
    }

    /// Arguments of the last pip invocation, after `-m pip`.
    pub fn pip_args(&self) -> Vec<String> {
        fs::read_to_string(self.root().join("pip_args"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn canonical(name: &str) -> String {
    let mut canonical = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !canonical.ends_with('-') {
                canonical.push('-');
            }
        } else {
            canonical.push(c.to_ascii_lowercase());
        }
    }
    canonical
}
