use std::path::{Path, PathBuf};
use std::sync::Mutex;

use procguard::guard::GuardHooks;
use procguard::types::OutputStream;

/// Hooks that record every call instead of acting on it.
///
/// `on_start_failed` does not open anything, so tests never launch a
/// desktop opener.
#[derive(Debug, Default)]
pub struct RecordingHooks {
    lines: Mutex<Vec<(OutputStream, String)>>,
    started: Mutex<Vec<(String, Option<u32>)>>,
    failed: Mutex<Vec<(String, PathBuf)>>,
}

impl RecordingHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(OutputStream, String)> {
        self.lines.lock().unwrap().clone()
    }

    pub fn lines_from(&self, stream: OutputStream) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(s, _)| *s == stream)
            .map(|(_, line)| line)
            .collect()
    }

    pub fn started(&self) -> Vec<(String, Option<u32>)> {
        self.started.lock().unwrap().clone()
    }

    pub fn failed(&self) -> Vec<(String, PathBuf)> {
        self.failed.lock().unwrap().clone()
    }
}

impl GuardHooks for RecordingHooks {
    fn on_output_line(&self, _guard: &str, stream: OutputStream, line: &str) {
        self.lines.lock().unwrap().push((stream, line.to_string()));
    }

    fn on_started(&self, guard: &str, pid: Option<u32>) {
        self.started.lock().unwrap().push((guard.to_string(), pid));
    }

    fn on_start_failed(&self, guard: &str, log_path: &Path) {
        self.failed
            .lock()
            .unwrap()
            .push((guard.to_string(), log_path.to_path_buf()));
    }
}
