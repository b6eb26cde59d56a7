//! Common test utilities

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a temporary directory with a .cmdx.yaml file
pub fn create_test_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join(".cmdx.yaml");
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}

/// Create a test config with a subdirectory to run cmdx from
pub fn create_test_config_in_subdir(content: &str) -> (TempDir, PathBuf, PathBuf) {
    let (temp_dir, config_path) = create_test_config(content);
    let sub_dir = temp_dir.path().join("subdir");
    fs::create_dir(&sub_dir).unwrap();
    (temp_dir, config_path, sub_dir)
}

/// The cmdx binary, run in `dir` with a clean cmdx environment
pub fn cmdx(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cmdx").unwrap();
    cmd.current_dir(dir)
        .env_remove("CMDX_CONFIG_PATH")
        .env_remove("CMDX_WORKING_DIR")
        .env_remove("CMDX_LOG");
    cmd
}
