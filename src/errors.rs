// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuardError {
    /// The guarded binary does not exist under the install root's `bin/`.
    #[error("Configuration error: executable not found at {}", .0.display())]
    MissingExecutable(PathBuf),

    /// A failure keyword was seen, or the process exited before reporting
    /// that it was ready.
    #[error("{name} failed to start")]
    StartupFailed { name: String },

    /// No started/failed signal arrived within the startup poll ceiling.
    #[error("{name} did not start in time")]
    StartupTimeout { name: String },

    #[error("failed to spawn {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Another guard already holds the log file for this name.
    #[error("log file {} is locked by another guard", .0.display())]
    LogLocked(PathBuf),

    /// A guard that had started reached `Stopped` without being asked to.
    #[error("{name} exited unexpectedly")]
    UnexpectedExit { name: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GuardError {
    /// Name of the guard this error is about, for start-time failures.
    pub fn guard_name(&self) -> Option<&str> {
        match self {
            GuardError::StartupFailed { name }
            | GuardError::StartupTimeout { name }
            | GuardError::Spawn { name, .. }
            | GuardError::UnexpectedExit { name } => Some(name),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GuardError>;
