// src/logging.rs

//! Diagnostics for `procguard` itself (not the captured child output, which
//! goes to the per-guard log files).
//!
//! The filter is chosen as:
//! 1. `--log-level` on the command line, applied to everything;
//! 2. otherwise `PROCGUARD_LOG`, read as `EnvFilter` directives, e.g.
//!    `procguard=debug` or `procguard[guard{name=web}]=trace`;
//! 3. otherwise [`DEFAULT_DIRECTIVES`].
//!
//! Guard lifecycle events and reader tasks run inside a `guard` span with a
//! `name` field, which is what the per-guard form above matches on.
//!
//! Output goes to stderr so that `--echo-output` owns stdout.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "PROCGUARD_LOG";

/// Used when neither the flag nor the environment says anything.
pub const DEFAULT_DIRECTIVES: &str = "info";

/// Install the global subscriber. Call once, before any guard starts.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let filter = env_filter(cli_level, env.as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}

/// Build the filter from the CLI level and the raw `PROCGUARD_LOG` value.
///
/// A malformed `PROCGUARD_LOG` is an error rather than silently ignored,
/// since it usually means a typo in a guard name or level.
pub fn env_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    if let Some(level) = cli_level {
        return Ok(EnvFilter::new(level_directive(level)));
    }

    match env.map(str::trim) {
        Some(directives) if !directives.is_empty() => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid {LOG_ENV} value {directives:?}")),
        _ => Ok(EnvFilter::new(DEFAULT_DIRECTIVES)),
    }
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_level_overrides_environment() {
        let filter = env_filter(Some(LogLevel::Debug), Some("procguard=trace")).unwrap();
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn environment_directives_are_kept_verbatim() {
        let filter = env_filter(None, Some(" procguard=trace ")).unwrap();
        assert_eq!(filter.to_string(), "procguard=trace");
    }

    #[test]
    fn blank_or_missing_environment_falls_back_to_default() {
        assert_eq!(env_filter(None, None).unwrap().to_string(), DEFAULT_DIRECTIVES);
        assert_eq!(env_filter(None, Some("  ")).unwrap().to_string(), DEFAULT_DIRECTIVES);
    }

    #[test]
    fn malformed_environment_is_reported() {
        let err = env_filter(None, Some("procguard=loudest")).unwrap_err();
        assert!(err.to_string().contains(LOG_ENV), "got {err}");
    }
}
