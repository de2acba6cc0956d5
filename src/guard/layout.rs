// src/guard/layout.rs

//! Filesystem layout of an installation that hosts guarded binaries.
//!
//! ```text
//! <root>/bin/<main_file>      guarded executables (also the working dir)
//! <root>/logging/<name>.log   one capture log per guard
//! ```

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn logging_dir(&self) -> PathBuf {
        self.root.join("logging")
    }

    pub fn log_path(&self, guard_name: &str) -> PathBuf {
        self.logging_dir().join(format!("{guard_name}.log"))
    }
}
