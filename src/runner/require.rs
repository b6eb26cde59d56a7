//! Pre-conditions checked before a task binds any parameter

use crate::config::types::Require;
use crate::error::{RequirementError, RequirementResult};
use std::env;
use std::path::Path;
use tracing::debug;

/// Check every requirement group of a task
pub fn check_requirements(require: &Require) -> RequirementResult<()> {
    for group in &require.exec {
        check_executables(group.as_slice())?;
    }
    for group in &require.environment {
        check_environment(group.as_slice())?;
    }
    Ok(())
}

/// Satisfied if any of the executables is found on `PATH`
pub fn check_executables(group: &[String]) -> RequirementResult<()> {
    if group.is_empty() || group.iter().any(|name| find_executable(name)) {
        return Ok(());
    }
    Err(RequirementError::Exec(group.to_vec()))
}

/// Satisfied if any of the environment variables is set to a non-empty value
pub fn check_environment(group: &[String]) -> RequirementResult<()> {
    if group.is_empty() || group.iter().any(|name| env_is_set(name)) {
        return Ok(());
    }
    Err(RequirementError::Environment(group.to_vec()))
}

fn env_is_set(name: &str) -> bool {
    env::var_os(name).map_or(false, |v| !v.is_empty())
}

fn find_executable(name: &str) -> bool {
    // Paths containing a separator are used as they are
    if name.contains(std::path::MAIN_SEPARATOR) {
        return is_executable(Path::new(name));
    }

    let Some(paths) = env::var_os("PATH") else {
        return false;
    };
    let found = env::split_paths(&paths).any(|dir| is_executable(&dir.join(name)));
    debug!(executable = name, found, "looked up executable");
    found
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
