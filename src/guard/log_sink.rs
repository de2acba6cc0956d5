// src/guard/log_sink.rs

//! Per-guard capture log.
//!
//! Both output readers write through the same sink. Every line is written
//! with a single `writeln!` while the mutex is held, so lines from the two
//! streams interleave but never split.

use std::fs::{self, File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::errors::{GuardError, Result};

#[derive(Debug, Clone)]
pub struct LogSink {
    path: Arc<PathBuf>,
    writer: Arc<Mutex<Option<LineWriter<File>>>>,
}

impl LogSink {
    /// Open (creating parent dirs) and truncate the log at `path`.
    ///
    /// The file is locked exclusively before it is truncated, so a second
    /// guard using the same name fails with [`GuardError::LogLocked`]
    /// instead of clobbering the first one's log.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(GuardError::LogLocked(path.to_path_buf()));
        }
        file.set_len(0)?;

        debug!(path = %path.display(), "log sink opened");

        Ok(Self {
            path: Arc::new(path.to_path_buf()),
            writer: Arc::new(Mutex::new(Some(LineWriter::new(file)))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Append one line. Lines arriving after [`close`](Self::close) are
    /// dropped.
    pub fn write_line(&self, line: &str) {
        let mut guard = self.lock();
        let Some(writer) = guard.as_mut() else {
            return;
        };
        if let Err(e) = writeln!(writer, "{line}") {
            warn!(path = %self.path.display(), error = %e, "failed to write log line");
        }
    }

    /// Flush and release the file (and its lock). Safe to call repeatedly.
    pub fn close(&self) {
        let Some(mut writer) = self.lock().take() else {
            return;
        };
        if let Err(e) = writer.flush() {
            debug!(path = %self.path.display(), error = %e, "flush on close failed");
        }
        debug!(path = %self.path.display(), "log sink closed");
    }

    fn lock(&self) -> MutexGuard<'_, Option<LineWriter<File>>> {
        // A reader that panicked mid-write leaves at worst a partial line.
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
