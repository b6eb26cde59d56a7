//! Configuration file discovery, parsing and creation

use crate::config::types::Config;
use crate::error::{ConfigError, ConfigResult};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default configuration file names to search for
pub const CONFIG_FILE_NAMES: &[&str] = &[".cmdx.yaml", ".cmdx.yml", "cmdx.yaml", "cmdx.yml"];

/// Path `--init` writes to when neither `--config` nor `--name` is given
pub const DEFAULT_CONFIG_FILE_NAME: &str = ".cmdx.yaml";

/// Starter document written by `--init`
pub const CONFIG_FILE_TEMPLATE: &str = r#"---
# the configuration file of cmdx, which is a task runner.
# timeout:
#   duration: 600
#   kill_after: 30
# input_envs:
# - "{{ name }}"
# script_envs:
# - "{{ name }}"
# environment:
#   FOO: foo
tasks:
- name: hello
  # short: h
  description: hello task
  flags:
  # - name: source
  #   short: s
  #   usage: source file path
  #   default: .drone.jsonnet
  #   required: true
  # - name: force
  #   short: f
  #   usage: force
  #   type: bool
  args:
  # - name: name
  #   usage: source file path
  #   required: true
  #   input_envs:
  #   - NAME
  environment:
    FOO: foo
  script: "echo $FOO"
"#;

/// Find the configuration file by searching current and parent directories
///
/// `file_name` replaces the default candidate names when given.
pub fn find_config_file(file_name: Option<&str>) -> ConfigResult<PathBuf> {
    let current_dir = env::current_dir().map_err(ConfigError::CurrentDir)?;
    find_config_file_from(current_dir, file_name)
}

/// Find the configuration file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf, file_name: Option<&str>) -> ConfigResult<PathBuf> {
    let names: Vec<&str> = match file_name {
        Some(name) => vec![name],
        None => CONFIG_FILE_NAMES.to_vec(),
    };
    let mut current_dir = start_dir;

    loop {
        for name in &names {
            let config_path = current_dir.join(name);
            if config_path.is_file() {
                debug!(path = %config_path.display(), "found configuration file");
                return Ok(config_path);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::NotFound(names.join(", "))),
        }
    }
}

/// Parse a configuration file from a path
pub fn parse_config_file(path: &Path) -> ConfigResult<Config> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse configuration from a string
pub fn parse_config(yaml: &str) -> Result<Config, serde_yaml::Error> {
    serde_yaml::from_str(yaml)
}

/// Write the starter configuration to `path`
///
/// An existing file is left untouched. Returns whether a file was written.
pub fn create_config_file(path: &Path) -> ConfigResult<bool> {
    if path.exists() {
        debug!(path = %path.display(), "configuration file already exists");
        return Ok(false);
    }
    fs::write(path, CONFIG_FILE_TEMPLATE).map_err(|source| ConfigError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validate_config;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_simple_config() {
        let yaml = r#"
tasks:
- name: hello
  usage: Say hello
  script: echo "hello"
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.tasks.len(), 1);
        assert_eq!(config.tasks[0].name, "hello");
    }

    #[test]
    fn test_find_config_in_current_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(".cmdx.yaml");
        fs::write(&config_path, "tasks: []\n").unwrap();

        let found = find_config_file_from(temp_dir.path().to_path_buf(), None).unwrap();
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("cmdx.yml");
        let sub_dir = temp_dir.path().join("subdir");

        fs::create_dir(&sub_dir).unwrap();
        fs::write(&config_path, "tasks: []\n").unwrap();

        let found = find_config_file_from(sub_dir, None).unwrap();
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_find_config_with_custom_name() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(".cmdx.yaml"), "tasks: []\n").unwrap();
        let custom = temp_dir.path().join("tasks.yaml");
        fs::write(&custom, "tasks: []\n").unwrap();

        let found =
            find_config_file_from(temp_dir.path().to_path_buf(), Some("tasks.yaml")).unwrap();
        assert_eq!(found, custom);
    }

    #[test]
    fn test_config_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let result =
            find_config_file_from(temp_dir.path().to_path_buf(), Some("missing-cmdx.yaml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_parse_config_file_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".cmdx.yaml");
        fs::write(&path, "tasks: {not: [a, list}\n").unwrap();

        let err = parse_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(".cmdx.yaml"));
    }

    #[test]
    fn test_create_config_file_is_valid_and_not_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DEFAULT_CONFIG_FILE_NAME);

        assert!(create_config_file(&path).unwrap());
        let config = parse_config_file(&path).unwrap();
        validate_config(&config).unwrap();
        assert_eq!(config.tasks[0].name, "hello");

        fs::write(&path, "tasks: []\n").unwrap();
        assert!(!create_config_file(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "tasks: []\n");
    }
}
