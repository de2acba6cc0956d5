// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod guard;
pub mod logging;
pub mod types;

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, GuardSection, config_dir, default_config_path, load_and_validate};
use crate::errors::GuardError;
use crate::guard::{Guard, GuardHooks, InstallLayout, open_for_inspection};
use crate::types::{GuardState, OutputStream};

/// How often the driver checks whether a running guard died on its own.
const SUPERVISE_INTERVAL: Duration = Duration::from_millis(250);

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - one [`Guard`] per selected `[guard.<name>]`, started in name order
/// - Ctrl-C handling and detection of guards that stop by themselves
pub async fn run(args: CliArgs) -> Result<()> {
    let hooks = Arc::new(CliHooks::from_args(&args));
    run_with_hooks(&args, hooks).await
}

/// [`run`] with caller-supplied hooks for every guard.
pub async fn run_with_hooks(args: &CliArgs, hooks: Arc<dyn GuardHooks>) -> Result<()> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config file at {:?}", config_path))?;
    let layout = cfg.layout(&config_dir(&config_path));

    let selected = select_guards(&cfg, &args.guards)?;

    if args.dry_run {
        print_dry_run(&layout, &selected);
        return Ok(());
    }

    let mut guards: Vec<Guard> = Vec::with_capacity(selected.len());
    for (name, section) in selected {
        let spec = section.to_spec(name);
        let started = match Guard::with_hooks(&layout, spec, Arc::clone(&hooks)) {
            Ok(mut guard) => guard
                .start(&section.args, section.priority)
                .await
                .map(|()| guard),
            Err(e) => Err(e),
        };

        match started {
            Ok(guard) => guards.push(guard),
            Err(e) => {
                error!(guard = %name, error = %e, "guard failed to start; stopping the others");
                stop_all(&mut guards).await;
                return Err(e.into());
            }
        }
    }

    info!(count = guards.len(), "all guards started; press Ctrl-C to stop");

    let outcome = supervise(&mut guards).await;
    stop_all(&mut guards).await;
    outcome
}

/// Resolve `--guard` selections against the config, in name order.
///
/// An empty selection means every configured guard.
fn select_guards<'a>(
    cfg: &'a ConfigFile,
    names: &[String],
) -> Result<Vec<(&'a str, &'a GuardSection)>, GuardError> {
    if names.is_empty() {
        return Ok(cfg
            .guard
            .iter()
            .map(|(name, section)| (name.as_str(), section))
            .collect());
    }

    let wanted: BTreeSet<&str> = names.iter().map(String::as_str).collect();
    wanted
        .into_iter()
        .map(|name| {
            cfg.guard
                .get_key_value(name)
                .map(|(name, section)| (name.as_str(), section))
                .ok_or_else(|| GuardError::ConfigError(format!("unknown guard '{}'", name)))
        })
        .collect()
}

/// Wait for Ctrl-C, or for any guard to stop without being asked to.
async fn supervise(guards: &mut [Guard]) -> Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(SUPERVISE_INTERVAL);

    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                res.context("listening for Ctrl-C")?;
                info!("shutdown requested");
                return Ok(());
            }
            _ = ticker.tick() => {
                for guard in guards.iter_mut() {
                    if !has_died(guard) {
                        continue;
                    }
                    error!(
                        guard = %guard.name(),
                        log = %guard.log_path().display(),
                        "guarded process stopped unexpectedly"
                    );
                    return Err(GuardError::UnexpectedExit {
                        name: guard.name().to_string(),
                    }
                    .into());
                }
            }
        }
    }
}

fn has_died(guard: &mut Guard) -> bool {
    guard.state() == GuardState::Stopped || !guard.is_running()
}

async fn stop_all(guards: &mut [Guard]) {
    for guard in guards.iter_mut().rev() {
        debug!(guard = %guard.name(), "stopping");
        guard.stop().await;
    }
}

type LogOpener = Box<dyn Fn(&Path) + Send + Sync>;
type LinePrinter = Box<dyn Fn(&str, OutputStream, &str) + Send + Sync>;

/// Hooks used by the binary driver: `--echo-output` and `--no-open-log`.
pub struct CliHooks {
    open_log_on_failure: bool,
    echo_output: bool,
    opener: LogOpener,
    printer: LinePrinter,
}

impl CliHooks {
    pub fn from_args(args: &CliArgs) -> Self {
        Self {
            open_log_on_failure: !args.no_open_log,
            echo_output: args.echo_output,
            opener: Box::new(open_for_inspection),
            printer: Box::new(print_line),
        }
    }

    /// Replace how a failed guard's log is surfaced.
    pub fn with_opener(mut self, opener: impl Fn(&Path) + Send + Sync + 'static) -> Self {
        self.opener = Box::new(opener);
        self
    }

    /// Replace where echoed lines go.
    pub fn with_printer(
        mut self,
        printer: impl Fn(&str, OutputStream, &str) + Send + Sync + 'static,
    ) -> Self {
        self.printer = Box::new(printer);
        self
    }
}

impl GuardHooks for CliHooks {
    fn on_output_line(&self, guard: &str, stream: OutputStream, line: &str) {
        if self.echo_output {
            (self.printer)(guard, stream, line);
        }
    }

    fn on_started(&self, guard: &str, pid: Option<u32>) {
        match pid {
            Some(pid) => info!(guard = %guard, pid, "ready"),
            None => info!(guard = %guard, "ready"),
        }
    }

    fn on_start_failed(&self, guard: &str, log_path: &Path) {
        if self.open_log_on_failure {
            (self.opener)(log_path);
        } else {
            info!(guard = %guard, log = %log_path.display(), "see log for startup output");
        }
    }
}

fn print_line(guard: &str, stream: OutputStream, line: &str) {
    match stream {
        OutputStream::Stdout => println!("[{guard}] {line}"),
        OutputStream::Stderr => eprintln!("[{guard}] {line}"),
    }
}

/// Dry-run output: print the resolved guards without starting them.
fn print_dry_run(layout: &InstallLayout, selected: &[(&str, &GuardSection)]) {
    println!("procguard dry-run");
    println!("  install root = {}", layout.root().display());
    println!();

    println!("guards ({}):", selected.len());
    for (name, section) in selected {
        let executable = layout.bin_dir().join(&section.main_file);
        let marker = if executable.is_file() { "" } else { "  (missing)" };
        println!("  - {name}");
        println!("      executable: {}{marker}", executable.display());
        println!("      log: {}", layout.log_path(name).display());
        if !section.args.is_empty() {
            println!("      args: {:?}", section.args);
        }
        println!("      redirect_output: {}", section.redirect_output);
        if section.redirect_output {
            println!("      encoding: {:?}", section.encoding);
        }
        println!("      priority: {:?}", section.priority);
        if !section.started_keywords.is_empty() {
            println!("      started_keywords: {:?}", section.started_keywords);
        }
        if !section.failed_keywords.is_empty() {
            println!("      failed_keywords: {:?}", section.failed_keywords);
        }
        let policy = section.startup.policy();
        println!(
            "      startup: {} polls x {:?} (ceiling {:?})",
            policy.max_polls,
            policy.poll_interval,
            policy.ceiling()
        );
    }

    debug!("dry-run complete (nothing started)");
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use clap::Parser;

    use super::*;

    fn two_guard_config() -> ConfigFile {
        let raw: crate::config::RawConfigFile = toml::from_str(
            r#"
[guard.web]
main_file = "web"

[guard.db]
main_file = "db"
"#,
        )
        .unwrap();
        ConfigFile::try_from(raw).unwrap()
    }

    #[test]
    fn empty_selection_means_all_in_name_order() {
        let cfg = two_guard_config();
        let names: Vec<&str> = select_guards(&cfg, &[])
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["db", "web"]);
    }

    fn recorded_hooks(argv: &[&str]) -> (CliHooks, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (opened, printed) = (Arc::clone(&seen), Arc::clone(&seen));
        let hooks = CliHooks::from_args(&CliArgs::parse_from(argv))
            .with_opener(move |path| opened.lock().unwrap().push(format!("open {}", path.display())))
            .with_printer(move |guard, stream, line| {
                printed.lock().unwrap().push(format!("{stream} [{guard}] {line}"))
            });
        (hooks, seen)
    }

    #[test]
    fn echo_output_forwards_lines_only_when_asked() {
        let (quiet, seen) = recorded_hooks(&["procguard"]);
        quiet.on_output_line("web", OutputStream::Stdout, "hello");
        assert!(seen.lock().unwrap().is_empty());

        let (echoing, seen) = recorded_hooks(&["procguard", "--echo-output"]);
        echoing.on_output_line("web", OutputStream::Stderr, "oops");
        assert_eq!(*seen.lock().unwrap(), vec![format!("{} [web] oops", OutputStream::Stderr)]);
    }

    #[test]
    fn no_open_log_suppresses_the_opener() {
        let log = Path::new("/tmp/logging/web.log");

        let (default, seen) = recorded_hooks(&["procguard"]);
        default.on_start_failed("web", log);
        assert_eq!(*seen.lock().unwrap(), vec!["open /tmp/logging/web.log".to_string()]);

        let (suppressed, seen) = recorded_hooks(&["procguard", "--no-open-log"]);
        suppressed.on_start_failed("web", log);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn dry_run_survives_an_oversized_startup_policy() {
        let raw: crate::config::RawConfigFile = toml::from_str(
            r#"
[guard.web]
main_file = "web"

[guard.web.startup]
poll_interval_ms = 9223372036854775807
max_polls = 4000
"#,
        )
        .unwrap();
        let cfg = ConfigFile::try_from(raw).unwrap();
        let layout = InstallLayout::new("/opt/app");
        let selected = select_guards(&cfg, &[]).unwrap();

        print_dry_run(&layout, &selected);
    }

    #[test]
    fn selection_dedupes_and_rejects_unknown() {
        let cfg = two_guard_config();
        let picked = select_guards(&cfg, &["web".to_string(), "web".to_string()]).unwrap();
        assert_eq!(picked.len(), 1);

        let err = select_guards(&cfg, &["cache".to_string()]).unwrap_err();
        assert!(err.to_string().contains("unknown guard 'cache'"));
    }
}
