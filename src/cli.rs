// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `procguard`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "procguard",
    version,
    about = "Start backend executables, watch their output until they report ready, and keep their logs.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Procguard.toml` in the current working directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only start the named guard(s). May be repeated.
    ///
    /// If omitted, every configured guard is started in name order.
    #[arg(long = "guard", value_name = "NAME")]
    pub guards: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROCGUARD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolved guards, but don't start anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Don't open the log file when a guard fails to start.
    #[arg(long)]
    pub no_open_log: bool,

    /// Print every captured output line, prefixed with the guard name.
    #[arg(long)]
    pub echo_output: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_start_every_guard() {
        let args = CliArgs::parse_from(["procguard"]);
        assert!(args.config.is_none());
        assert!(args.guards.is_empty());
        assert!(!args.dry_run);
        assert!(!args.no_open_log);
    }

    #[test]
    fn guard_flag_repeats() {
        let args = CliArgs::parse_from([
            "procguard",
            "--guard",
            "db",
            "--guard",
            "web",
            "--log-level",
            "debug",
            "--echo-output",
        ]);
        assert_eq!(args.guards, vec!["db".to_string(), "web".to_string()]);
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert!(args.echo_output);
    }
}
