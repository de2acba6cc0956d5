// src/guard/launcher.rs

//! Process construction.
//!
//! Resolves the guarded binary inside the install's `bin/` directory and
//! builds the `tokio::process::Command` used for each start: working
//! directory `bin/`, no console window, both output streams piped together
//! or both inherited, and the requested scheduling priority.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::{GuardError, Result};
use crate::guard::layout::InstallLayout;
use crate::types::Priority;

/// Resolved launch parameters for one guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    pub executable: PathBuf,
    pub working_dir: PathBuf,
    pub redirect_output: bool,
}

impl LaunchConfig {
    /// Resolve `main_file` under `layout.bin_dir()` and check that it exists.
    pub fn resolve(layout: &InstallLayout, main_file: &str, redirect_output: bool) -> Result<Self> {
        let working_dir = std::path::absolute(layout.bin_dir())?;
        let executable = working_dir.join(main_file);

        if !executable.is_file() {
            return Err(GuardError::MissingExecutable(executable));
        }

        Ok(Self {
            executable,
            working_dir,
            redirect_output,
        })
    }

    /// Build a fresh command for one start.
    pub fn command<I, S>(&self, args: I, priority: Priority) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.executable);
        cmd.args(args).current_dir(&self.working_dir).stdin(Stdio::null());

        if self.redirect_output {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW | priority.priority_class());
        }
        #[cfg(not(windows))]
        let _ = priority;

        cmd
    }
}

/// Apply `priority` to an already running child.
///
/// On Windows the priority class is set at creation time, so this is a
/// no-op there. Failures are logged and ignored.
pub fn apply_priority(guard: &str, pid: Option<u32>, priority: Priority) {
    if priority == Priority::Normal {
        return;
    }
    let Some(pid) = pid else {
        debug!(guard = %guard, "child already gone; priority not applied");
        return;
    };

    #[cfg(unix)]
    {
        let nice = priority.nice_value();
        // SAFETY: setpriority only reads its scalar arguments; an invalid or
        // exited pid is reported through the return value and errno.
        let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, pid as libc::id_t, nice) };
        if rc == -1 {
            let err = std::io::Error::last_os_error();
            warn!(guard = %guard, pid, nice, error = %err, "failed to set process priority");
        } else {
            debug!(guard = %guard, pid, nice, "process priority set");
        }
    }

    #[cfg(not(unix))]
    {
        debug!(guard = %guard, pid, ?priority, "priority applied at creation");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path());

        let err = LaunchConfig::resolve(&layout, "no-such-server", true).unwrap_err();
        match err {
            GuardError::MissingExecutable(path) => {
                assert!(path.ends_with("bin/no-such-server"));
                assert!(path.is_absolute());
            }
            other => panic!("expected MissingExecutable, got {other:?}"),
        }
    }

    #[test]
    fn directory_is_not_an_executable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("bin").join("server")).unwrap();
        let layout = InstallLayout::new(dir.path());

        assert!(LaunchConfig::resolve(&layout, "server", true).is_err());
    }

    #[test]
    fn resolves_into_bin_dir() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("server"), b"").unwrap();
        let layout = InstallLayout::new(dir.path());

        let cfg = LaunchConfig::resolve(&layout, "server", false).unwrap();
        assert_eq!(cfg.working_dir, bin);
        assert_eq!(cfg.executable, bin.join("server"));
        assert!(!cfg.redirect_output);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn lowering_priority_is_applied_to_child() {
        let mut child = Command::new("sleep")
            .arg("5")
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let pid = child.id();

        apply_priority("nice-test", pid, Priority::Idle);

        // SAFETY: getpriority only reads scalar arguments.
        let nice = unsafe { libc::getpriority(libc::PRIO_PROCESS, pid.unwrap() as libc::id_t) };
        let _ = child.kill().await;

        assert_eq!(nice, Priority::Idle.nice_value());
    }
}
