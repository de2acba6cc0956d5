// src/guard/spec.rs

//! What a guard supervises: the binary, how its output is captured, and
//! which substrings mean "ready" or "broken".

use std::time::Duration;

use crate::errors::{GuardError, Result};
use crate::types::OutputEncoding;

/// Poll interval of the startup wait loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Number of poll slices before startup is declared timed out.
pub const DEFAULT_MAX_POLLS: u32 = 1000;

/// Bounds of the startup wait protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupPolicy {
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl StartupPolicy {
    /// Upper bound on how long `start` waits for a terminal state.
    ///
    /// Saturates at `Duration::MAX` for absurdly large policies.
    pub fn ceiling(&self) -> Duration {
        self.poll_interval
            .checked_mul(self.max_polls)
            .unwrap_or(Duration::MAX)
    }
}

impl Default for StartupPolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }
}

/// Result of testing one output line against the keyword sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineVerdict<'a> {
    Started(&'a str),
    Failed(&'a str),
}

/// Ordered started/failed keyword lists.
///
/// Matching is case-sensitive substring containment. Started keywords are
/// checked before failed keywords, so a line containing one of each
/// resolves to [`LineVerdict::Started`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    pub started: Vec<String>,
    pub failed: Vec<String>,
}

impl KeywordSet {
    pub fn classify<'a>(&'a self, line: &str) -> Option<LineVerdict<'a>> {
        if let Some(kw) = self.started.iter().find(|kw| line.contains(kw.as_str())) {
            return Some(LineVerdict::Started(kw.as_str()));
        }
        self.failed
            .iter()
            .find(|kw| line.contains(kw.as_str()))
            .map(|kw| LineVerdict::Failed(kw.as_str()))
    }

    /// Without started keywords the launch itself counts as success.
    pub fn detects_readiness(&self) -> bool {
        !self.started.is_empty()
    }
}

/// Static description of one guarded backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardSpec {
    pub name: String,
    /// Executable file name, relative to the install's `bin/` directory.
    pub main_file: String,
    pub redirect_output: bool,
    pub encoding: OutputEncoding,
    pub keywords: KeywordSet,
    pub startup: StartupPolicy,
}

/// Check that `name` can be used as a log file name under `logging/`.
///
/// It must be a single plain path component: not empty, no `/` or `\`,
/// not `.` or `..`.
pub fn check_guard_name(name: &str) -> Result<()> {
    let bad = name.trim().is_empty()
        || name.contains(['/', '\\'])
        || name == "."
        || name == "..";
    if bad {
        return Err(GuardError::ConfigError(format!(
            "invalid guard name '{}': must be a non-empty file name without path separators",
            name
        )));
    }
    Ok(())
}

impl GuardSpec {
    pub fn new(name: impl Into<String>, main_file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            main_file: main_file.into(),
            redirect_output: true,
            encoding: OutputEncoding::default(),
            keywords: KeywordSet::default(),
            startup: StartupPolicy::default(),
        }
    }

    pub fn redirect_output(mut self, redirect: bool) -> Self {
        self.redirect_output = redirect;
        self
    }

    pub fn encoding(mut self, encoding: OutputEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn started_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.started = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn failed_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.failed = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn startup(mut self, policy: StartupPolicy) -> Self {
        self.startup = policy;
        self
    }
}
