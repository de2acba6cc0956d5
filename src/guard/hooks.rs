// src/guard/hooks.rs

//! Extension points for concrete backends.
//!
//! The state machine and log capture are fixed; a backend customizes only
//! what happens around them by implementing [`GuardHooks`]. Every method has
//! a default, so implementors override just the hooks they need.

use std::path::Path;
use std::process::Command;

use tracing::{debug, info, warn};

use crate::types::OutputStream;

pub trait GuardHooks: Send + Sync {
    /// Called for every captured line, after it was written to the log.
    ///
    /// Runs on the reader task, so it should not block for long.
    fn on_output_line(&self, _guard: &str, _stream: OutputStream, _line: &str) {}

    /// Called once when the startup wait protocol observes `Started`.
    fn on_started(&self, _guard: &str, _pid: Option<u32>) {}

    /// Called once after a failed start has been shut down, before the
    /// error is returned to the caller.
    fn on_start_failed(&self, guard: &str, log_path: &Path) {
        debug!(guard = %guard, "surfacing log after failed start");
        open_for_inspection(log_path);
    }
}

/// Hooks that keep every default behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl GuardHooks for DefaultHooks {}

/// Open `path` with the desktop's default handler, detached.
///
/// Failures are logged and otherwise ignored: a missing opener must never
/// turn a startup failure into a different error.
pub fn open_for_inspection(path: &Path) {
    let mut cmd = opener_command(path);
    match cmd.spawn() {
        Ok(mut child) => {
            info!(path = %path.display(), "opened log for inspection");
            // Reap the opener without blocking the caller.
            std::thread::spawn(move || {
                let _ = child.wait();
            });
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not open log for inspection");
        }
    }
}

#[cfg(target_os = "windows")]
fn opener_command(path: &Path) -> Command {
    let mut cmd = Command::new("explorer");
    cmd.arg(path);
    cmd
}

#[cfg(target_os = "macos")]
fn opener_command(path: &Path) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(path);
    cmd
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn opener_command(path: &Path) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(path);
    cmd
}
