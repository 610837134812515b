//! Running bootstrap scripts in a target interpreter.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};

/// Run `executable -c script args...` and return its stdout.
///
/// A non-zero exit is reported as [`Error::ProcessFailed`] with the captured
/// output.
pub(crate) fn run_script<S: AsRef<str>>(executable: &Path, script: &str, args: &[S]) -> Result<String> {
    tracing::debug!(
        executable = %executable.display(),
        script = script.lines().next().unwrap_or_default(),
        args = args.len(),
        "running python"
    );

    let output = Command::new(executable)
        .arg("-c")
        .arg(script)
        .args(args.iter().map(AsRef::as_ref))
        .output()
        .map_err(|source| Error::ProcessSpawn {
            program: executable.to_path_buf(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if output.status.success() {
        Ok(stdout)
    } else {
        Err(Error::ProcessFailed {
            program: executable.to_path_buf(),
            code: output.status.code(),
            stdout,
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Locate an interpreter.
///
/// A bare name such as `python3` is searched on `PATH`. Anything else is
/// made absolute against the current directory without resolving symlinks,
/// since a virtual environment's interpreter is usually a symlink.
pub fn resolve_executable(executable: &Path) -> Result<PathBuf> {
    let not_found = || Error::ExecutableNotFound {
        executable: executable.display().to_string(),
    };

    let is_bare_name = executable.components().count() == 1 && !executable.is_absolute();
    if !is_bare_name {
        let path = std::path::absolute(executable).map_err(|_| not_found())?;
        return if path.is_file() { Ok(path) } else { Err(not_found()) };
    }

    let path_var = std::env::var_os("PATH").unwrap_or_default();
    let extensions: Vec<String> = if cfg!(windows) {
        std::env::var("PATHEXT")
            .unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string())
            .split(';')
            .map(|s| s.to_ascii_lowercase())
            .collect()
    } else {
        vec![String::new()]
    };

    for dir in std::env::split_paths(&path_var) {
        for ext in &extensions {
            let mut name = executable.as_os_str().to_owned();
            name.push(ext);
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    Err(not_found())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("bin").join("python");
        assert!(matches!(
            resolve_executable(&missing),
            Err(Error::ExecutableNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_keeps_path_unresolved() {
        let dir = tempfile::tempdir().unwrap();
        let python = dir.path().join("python");
        std::fs::write(&python, "").unwrap();
        assert_eq!(resolve_executable(&python).unwrap(), python);
    }

    #[test]
    fn test_resolve_unknown_bare_name() {
        let result = resolve_executable(Path::new("definitely-not-a-python-interpreter"));
        assert!(matches!(result, Err(Error::ExecutableNotFound { .. })));
    }
}
