#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Run the CLI binary against the store at `root`.
pub fn run_cli(args: &[&str], root: &Path) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_docrepo"));
    cmd.args(args);
    cmd.env("DOCREPO_ROOT", root);
    cmd.env_remove("RUST_LOG");
    cmd.output().expect("Failed to execute CLI")
}

/// Run the CLI and expect success, returning stdout.
pub fn run_cli_success(args: &[&str], root: &Path) -> String {
    let output = run_cli(args, root);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// A scratch directory holding a store root and input files.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("store")
    }

    /// Write an input file and return its path as a string.
    pub fn file(&self, name: &str, contents: &str) -> String {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path.to_string_lossy().to_string()
    }

    pub fn run(&self, args: &[&str]) -> Output {
        run_cli(args, &self.root())
    }

    pub fn run_success(&self, args: &[&str]) -> String {
        run_cli_success(args, &self.root())
    }
}

/// Parse each non-empty stdout line as JSON.
pub fn json_lines(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}
