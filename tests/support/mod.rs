//! Test support utilities for kanuka integration tests.
//!
//! Provides reusable test environment setup and helper commands.

#![allow(dead_code)]

pub mod commands;

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Default email for the first (initializing) user.
pub const ALICE: &str = "alice@example.com";

/// Email for the second user in multi-device scenarios.
pub const BOB: &str = "bob@example.com";

/// Test environment with isolated temp directories.
///
/// Each test gets its own project dir plus one home dir per user.
/// No process-global state is mutated: child processes receive HOME
/// via the environment and run with `.current_dir()`, so tests can
/// safely run in parallel.
pub struct Test {
    /// Temporary directory for the test project
    pub dir: TempDir,
    /// Temporary home directory for the first user
    pub home: TempDir,
}

impl Test {
    /// Create a new empty test environment.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let home = TempDir::new().expect("failed to create temp home");
        Self { dir, home }
    }

    /// Create a test environment with a project initialized by ALICE.
    pub fn init() -> Self {
        let t = Self::new();
        let output = t.init_cmd(ALICE, "laptop");
        assert!(
            output.status.success(),
            "failed to initialize project: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        t
    }

    /// A fresh home directory for an additional user.
    pub fn new_home(&self) -> TempDir {
        TempDir::new().expect("failed to create temp home")
    }

    /// Path of a file inside the test project.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write a plaintext file inside the test project.
    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    /// Read a file inside the test project.
    pub fn read(&self, rel: &str) -> Vec<u8> {
        std::fs::read(self.path(rel)).unwrap()
    }

    /// Snapshot of every file under a directory: relative path -> bytes.
    ///
    /// Used by dry-run tests to assert that nothing changed.
    pub fn snapshot(dir: &Path) -> std::collections::BTreeMap<String, Vec<u8>> {
        let mut out = std::collections::BTreeMap::new();
        for entry in walk(dir) {
            let rel = entry.strip_prefix(dir).unwrap().display().to_string();
            out.insert(rel, std::fs::read(&entry).unwrap());
        }
        out
    }
}

fn walk(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}
