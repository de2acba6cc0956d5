// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::guard::{GuardSpec, InstallLayout, StartupPolicy};
use crate::guard::spec::{DEFAULT_MAX_POLLS, DEFAULT_POLL_INTERVAL};
use crate::types::{OutputEncoding, Priority};

/// Configuration exactly as deserialized from TOML, before validation.
///
/// ```toml
/// [install]
/// root = "/opt/app"
///
/// [guard.web]
/// main_file = "web-server"
/// args = ["--port", "8080"]
/// started_keywords = ["listening on"]
/// failed_keywords = ["FATAL"]
///
/// [guard.web.startup]
/// poll_interval_ms = 50
/// max_polls = 1000
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub install: InstallSection,

    /// All guards from `[guard.<name>]`, keyed by guard name.
    #[serde(default)]
    pub guard: BTreeMap<String, GuardSection>,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub install: InstallSection,
    pub guard: BTreeMap<String, GuardSection>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        install: InstallSection,
        guard: BTreeMap<String, GuardSection>,
    ) -> Self {
        Self { install, guard }
    }

    /// Install layout, with a relative (or missing) `install.root` taken
    /// relative to `config_dir`.
    pub fn layout(&self, config_dir: &Path) -> InstallLayout {
        match &self.install.root {
            Some(root) if root.is_absolute() => InstallLayout::new(root),
            Some(root) => InstallLayout::new(config_dir.join(root)),
            None => InstallLayout::new(config_dir),
        }
    }

    pub fn guard_spec(&self, name: &str) -> Option<GuardSpec> {
        self.guard.get(name).map(|section| section.to_spec(name))
    }
}

/// `[install]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstallSection {
    /// Installation root holding `bin/` and `logging/`.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// `[guard.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardSection {
    /// Executable file name inside `<root>/bin`.
    pub main_file: String,

    /// Arguments passed on every start.
    #[serde(default)]
    pub args: Vec<String>,

    /// Capture stdout/stderr; when false the child inherits our streams
    /// and no startup detection happens.
    #[serde(default = "default_redirect_output")]
    pub redirect_output: bool,

    #[serde(default)]
    pub encoding: OutputEncoding,

    #[serde(default)]
    pub priority: Priority,

    /// Substrings that mean "ready". Empty: launch alone counts as started.
    #[serde(default)]
    pub started_keywords: Vec<String>,

    /// Substrings that mean startup failed.
    #[serde(default)]
    pub failed_keywords: Vec<String>,

    #[serde(default)]
    pub startup: StartupSection,
}

fn default_redirect_output() -> bool {
    true
}

impl GuardSection {
    pub fn to_spec(&self, name: &str) -> GuardSpec {
        GuardSpec::new(name, self.main_file.as_str())
            .redirect_output(self.redirect_output)
            .encoding(self.encoding)
            .started_keywords(self.started_keywords.iter().cloned())
            .failed_keywords(self.failed_keywords.iter().cloned())
            .startup(self.startup.policy())
    }
}

/// `[guard.<name>.startup]` section.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StartupSection {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_max_polls() -> u32 {
    DEFAULT_MAX_POLLS
}

impl StartupSection {
    pub fn policy(&self) -> StartupPolicy {
        StartupPolicy {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_polls: self.max_polls,
        }
    }
}

impl Default for StartupSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_polls: default_max_polls(),
        }
    }
}
