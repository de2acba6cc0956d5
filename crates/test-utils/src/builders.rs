#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use procguard::guard::{GuardSpec, InstallLayout, StartupPolicy};
use tempfile::TempDir;

/// Startup policy for tests: 20ms polls with a 5s ceiling.
pub fn fast_policy() -> StartupPolicy {
    StartupPolicy {
        poll_interval: Duration::from_millis(20),
        max_polls: 250,
    }
}

/// Arguments making the `sh` guard run `script`.
///
/// Scripts should `exec` their final long-running command so that killing
/// the guard kills the process holding the pipes.
pub fn script(body: &str) -> Vec<String> {
    vec!["-c".to_string(), body.to_string()]
}

/// A throwaway install root whose `bin/sh` points at the system shell.
///
/// Linking instead of copying avoids `ETXTBSY` when a freshly written
/// executable is spawned while another test thread forks.
pub struct ShellInstall {
    dir: TempDir,
    layout: InstallLayout,
}

impl ShellInstall {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp install root");
        let layout = InstallLayout::new(dir.path());
        std::fs::create_dir_all(layout.bin_dir()).expect("failed to create bin dir");

        #[cfg(unix)]
        std::os::unix::fs::symlink("/bin/sh", layout.bin_dir().join("sh"))
            .expect("failed to link /bin/sh into bin dir");

        Self { dir, layout }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    /// A spec for a shell guard named `name` using [`fast_policy`].
    pub fn spec(&self, name: &str) -> GuardSpec {
        GuardSpec::new(name, "sh").startup(fast_policy())
    }

    pub fn log_path(&self, name: &str) -> PathBuf {
        self.layout.log_path(name)
    }

    pub fn log_contents(&self, name: &str) -> String {
        std::fs::read_to_string(self.log_path(name)).unwrap_or_default()
    }

    /// Poll the log of `name` until `pred` holds, or panic after 5s.
    pub async fn wait_for_log<F>(&self, name: &str, pred: F) -> String
    where
        F: Fn(&str) -> bool,
    {
        for _ in 0..250 {
            let contents = self.log_contents(name);
            if pred(&contents) {
                return contents;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!(
            "log for {name} never matched; last contents:\n{}",
            self.log_contents(name)
        );
    }
}

impl Default for ShellInstall {
    fn default() -> Self {
        Self::new()
    }
}
