use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Supervisory state of a guard.
///
/// `Waiting` until the first start; every start re-arms `Starting`, after
/// which the run ends in one of the two terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardState {
    #[default]
    Waiting,
    Starting,
    Started,
    Stopped,
}

impl GuardState {
    pub fn is_terminal(self) -> bool {
        matches!(self, GuardState::Started | GuardState::Stopped)
    }
}

impl fmt::Display for GuardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GuardState::Waiting => "waiting",
            GuardState::Starting => "starting",
            GuardState::Started => "started",
            GuardState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Which child stream a captured line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStream::Stdout => f.write_str("stdout"),
            OutputStream::Stderr => f.write_str("stderr"),
        }
    }
}

/// Character encoding used to decode captured output.
///
/// Only applied when output is redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum OutputEncoding {
    /// UTF-8; invalid sequences are replaced with U+FFFD.
    #[default]
    Utf8,
    /// ISO-8859-1: every byte is the code point of the same value.
    Latin1,
}

impl OutputEncoding {
    /// Decode one raw line, dropping the trailing `\n` or `\r\n`.
    pub fn decode_line<'a>(&self, raw: &'a [u8]) -> Cow<'a, str> {
        let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);

        match self {
            OutputEncoding::Utf8 => String::from_utf8_lossy(raw),
            OutputEncoding::Latin1 => Cow::Owned(raw.iter().map(|&b| b as char).collect()),
        }
    }
}

impl FromStr for OutputEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(OutputEncoding::Utf8),
            "latin1" | "latin-1" | "iso-8859-1" => Ok(OutputEncoding::Latin1),
            other => Err(format!(
                "invalid encoding: {other} (expected \"utf-8\" or \"latin1\")"
            )),
        }
    }
}

impl TryFrom<String> for OutputEncoding {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Scheduling priority requested for the child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Priority {
    Idle,
    BelowNormal,
    #[default]
    Normal,
    AboveNormal,
    High,
    Realtime,
}

impl Priority {
    /// Unix nice value for this priority.
    pub fn nice_value(self) -> i32 {
        match self {
            Priority::Idle => 19,
            Priority::BelowNormal => 10,
            Priority::Normal => 0,
            Priority::AboveNormal => -5,
            Priority::High => -10,
            Priority::Realtime => -20,
        }
    }

    /// Windows priority-class creation flag for this priority.
    pub fn priority_class(self) -> u32 {
        match self {
            Priority::Idle => 0x0000_0040,
            Priority::BelowNormal => 0x0000_4000,
            Priority::Normal => 0x0000_0020,
            Priority::AboveNormal => 0x0000_8000,
            Priority::High => 0x0000_0080,
            Priority::Realtime => 0x0000_0100,
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "idle" => Ok(Priority::Idle),
            "belownormal" => Ok(Priority::BelowNormal),
            "normal" => Ok(Priority::Normal),
            "abovenormal" => Ok(Priority::AboveNormal),
            "high" => Ok(Priority::High),
            "realtime" => Ok(Priority::Realtime),
            _ => Err(format!(
                "invalid priority: {} (expected idle, below_normal, normal, above_normal, high or realtime)",
                s.trim()
            )),
        }
    }
}

impl TryFrom<String> for Priority {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
