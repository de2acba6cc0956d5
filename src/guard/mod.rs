// src/guard/mod.rs

//! Process supervisor.
//!
//! A [`Guard`] owns exactly one child process at a time. Starting it:
//! - truncates and locks `<root>/logging/<name>.log`,
//! - spawns the binary from `<root>/bin`,
//! - if output is redirected, arms one [`reader::OutputReader`] per stream
//!   and waits (bounded by the [`StartupPolicy`]) until the readers report
//!   `Started` or `Stopped`.
//!
//! A failed or timed-out start is shut down before the error is returned,
//! so callers never see a half-stopped guard. Dropping a guard closes its
//! log and kills a still-running child.

pub mod hooks;
pub mod launcher;
pub mod layout;
pub mod log_sink;
pub mod reader;
pub mod spec;
pub mod state;

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::process::Child;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::errors::{GuardError, Result};
use crate::types::{GuardState, OutputStream, Priority};

pub use hooks::{DefaultHooks, GuardHooks, open_for_inspection};
pub use launcher::LaunchConfig;
pub use layout::InstallLayout;
pub use log_sink::LogSink;
pub use reader::OutputReader;
pub use spec::{GuardSpec, KeywordSet, LineVerdict, StartupPolicy, check_guard_name};
pub use state::StateCell;

pub struct Guard {
    name: Arc<str>,
    spec: GuardSpec,
    keywords: Arc<KeywordSet>,
    launch: LaunchConfig,
    log_path: PathBuf,
    hooks: Arc<dyn GuardHooks>,
    /// Replaced on every start so readers of a previous run cannot touch
    /// the state of the current one.
    state: StateCell,
    child: Option<Child>,
    pid: Option<u32>,
    log: Option<LogSink>,
}

impl Guard {
    /// Build a guard with [`DefaultHooks`].
    pub fn new(layout: &InstallLayout, spec: GuardSpec) -> Result<Self> {
        Self::with_hooks(layout, spec, Arc::new(DefaultHooks))
    }

    /// Build a guard, failing with [`GuardError::ConfigError`] if the name
    /// cannot be a log file name and with [`GuardError::MissingExecutable`]
    /// if the binary is not present under `layout.bin_dir()`.
    pub fn with_hooks(
        layout: &InstallLayout,
        spec: GuardSpec,
        hooks: Arc<dyn GuardHooks>,
    ) -> Result<Self> {
        check_guard_name(&spec.name)?;
        let launch = LaunchConfig::resolve(layout, &spec.main_file, spec.redirect_output)?;
        let log_path = std::path::absolute(layout.log_path(&spec.name))?;

        debug!(
            guard = %spec.name,
            executable = %launch.executable.display(),
            log = %log_path.display(),
            redirect = spec.redirect_output,
            "guard configured"
        );

        Ok(Self {
            name: Arc::from(spec.name.as_str()),
            keywords: Arc::new(spec.keywords.clone()),
            spec,
            launch,
            log_path,
            hooks,
            state: StateCell::new(),
            child: None,
            pid: None,
            log: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &GuardSpec {
        &self.spec
    }

    pub fn state(&self) -> GuardState {
        self.state.current()
    }

    /// Watch the state of the current run.
    pub fn subscribe(&self) -> watch::Receiver<GuardState> {
        self.state.subscribe()
    }

    /// Process id of the most recently spawned child.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn executable(&self) -> &Path {
        &self.launch.executable
    }

    pub fn working_dir(&self) -> &Path {
        &self.launch.working_dir
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Whether the child has been spawned and has not exited yet.
    pub fn is_running(&mut self) -> bool {
        self.child
            .as_mut()
            .is_some_and(|child| matches!(child.try_wait(), Ok(None)))
    }

    /// Start the child and, when output is captured, wait until it reports
    /// ready.
    ///
    /// Returns `Ok(())` once the run is `Started` (or right after spawn when
    /// output is not redirected). On [`GuardError::StartupFailed`] and
    /// [`GuardError::StartupTimeout`] the child has already been killed and
    /// the log closed.
    #[instrument(name = "guard", skip_all, fields(name = %self.name))]
    pub async fn start<I, S>(&mut self, args: I, priority: Priority) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        if self.child.is_some() || self.log.is_some() {
            debug!(guard = %self.name, "releasing previous run before restart");
            self.stop().await;
        }

        self.state = StateCell::new();
        self.state.force(GuardState::Starting);

        let log = match LogSink::create(&self.log_path) {
            Ok(log) => log,
            Err(e) => {
                self.state.force(GuardState::Stopped);
                return Err(e);
            }
        };
        self.log = Some(log.clone());

        info!(
            guard = %self.name,
            executable = %self.launch.executable.display(),
            ?priority,
            "starting guarded process"
        );

        self.child = None;
        self.pid = None;

        let spawned = self.launch.command(args, priority).spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(source) => {
                self.stop().await;
                self.state.force(GuardState::Stopped);
                return Err(GuardError::Spawn {
                    name: self.name.to_string(),
                    source,
                });
            }
        };

        self.pid = child.id();
        launcher::apply_priority(&self.name, self.pid, priority);
        info!(guard = %self.name, pid = ?self.pid, "process spawned");

        if !self.launch.redirect_output {
            self.child = Some(child);
            return Ok(());
        }

        // Without started keywords the launch itself counts. Setting it before
        // the readers exist keeps them from classifying any line.
        if !self.keywords.detects_readiness() {
            self.state.force(GuardState::Started);
            info!(guard = %self.name, "no started keywords; treating launch as started");
        }

        if let Some(stdout) = child.stdout.take() {
            self.reader(OutputStream::Stdout, &log).spawn(stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            self.reader(OutputStream::Stderr, &log).spawn(stderr);
        }
        self.child = Some(child);

        self.await_startup().await
    }

    /// Close the log and hard-kill the child if it is still running.
    ///
    /// Idempotent, and safe before any start or after a failed one. OS
    /// errors while killing are logged, never returned.
    #[instrument(name = "guard", skip_all, fields(name = %self.name))]
    pub async fn stop(&mut self) {
        if let Some(log) = self.log.take() {
            log.close();
        }

        let Some(child) = self.child.as_mut() else {
            return;
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(guard = %self.name, %status, "process already exited");
            }
            Ok(None) => match child.kill().await {
                Ok(()) => info!(guard = %self.name, pid = ?self.pid, "process killed"),
                Err(e) => warn!(
                    guard = %self.name,
                    pid = ?self.pid,
                    error = %e,
                    "failed to kill process"
                ),
            },
            Err(e) => {
                warn!(guard = %self.name, error = %e, "failed to query process status");
            }
        }
    }

    fn reader(&self, stream: OutputStream, log: &LogSink) -> OutputReader {
        OutputReader {
            guard: Arc::clone(&self.name),
            stream,
            encoding: self.spec.encoding,
            keywords: Arc::clone(&self.keywords),
            state: self.state.clone(),
            log: log.clone(),
            hooks: Arc::clone(&self.hooks),
        }
    }

    async fn await_startup(&mut self) -> Result<()> {
        if !self.keywords.detects_readiness() {
            return Ok(());
        }

        let policy = self.spec.startup;
        match self.state.wait_for_terminal(&policy).await {
            Some(GuardState::Started) => {
                info!(guard = %self.name, pid = ?self.pid, "guarded process started");
                self.hooks.on_started(&self.name, self.pid);
                Ok(())
            }
            Some(_) => {
                warn!(
                    guard = %self.name,
                    log = %self.log_path.display(),
                    "guarded process failed to start"
                );
                self.stop().await;
                self.hooks.on_start_failed(&self.name, &self.log_path);
                Err(GuardError::StartupFailed {
                    name: self.name.to_string(),
                })
            }
            None => {
                warn!(
                    guard = %self.name,
                    ceiling_ms = u64::try_from(policy.ceiling().as_millis()).unwrap_or(u64::MAX),
                    "guarded process did not start in time"
                );
                self.stop().await;
                self.state.force(GuardState::Stopped);
                Err(GuardError::StartupTimeout {
                    name: self.name.to_string(),
                })
            }
        }
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        if let Some(log) = self.log.take() {
            log.close();
        }

        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Ok(None) = child.try_wait() {
            match child.start_kill() {
                Ok(()) => debug!(guard = %self.name, pid = ?self.pid, "killed process on drop"),
                Err(e) => warn!(
                    guard = %self.name,
                    error = %e,
                    "failed to kill process on drop"
                ),
            }
        }
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard")
            .field("name", &self.name)
            .field("executable", &self.launch.executable)
            .field("state", &self.state.current())
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}
