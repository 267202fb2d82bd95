//! Common test utilities for chainprobe integration tests
//!
//! - Suite fixtures written to a temporary directory
//! - CLI invocation isolated from the user's config directory

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Exit code when at least one step failed
pub const EXIT_STEPS_FAILED: i32 = 10;

/// Scratch space for one CLI run: suite files, config dir and report dir
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_dir(&self) -> PathBuf {
        self.path().join("config")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.path().join("reports")
    }

    /// Write a suite document and return its path
    pub fn write_suite(&self, name: &str, suite: &Value) -> PathBuf {
        self.write_file(name, &serde_json::to_string_pretty(suite).expect("Failed to encode suite"))
    }

    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    pub fn write_config(&self, content: &str) {
        std::fs::create_dir_all(self.config_dir()).expect("Failed to create config dir");
        std::fs::write(self.config_dir().join("config.toml"), content).expect("Failed to write config");
    }

    /// The binary, with config and colours pinned for reproducible output
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_chainprobe"));
        cmd.env("CHAINPROBE_CONFIG_DIR", self.config_dir())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .current_dir(self.path());
        cmd
    }

    /// Files in the report directory
    pub fn reports(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(self.reports_dir()) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}
