pub mod builders;
pub mod recording_hooks;

use std::future::Future;
use std::time::Duration;

use procguard::logging::{LOG_ENV, env_filter};
use tracing_subscriber::{EnvFilter, fmt};

/// Filter for test runs when `PROCGUARD_LOG` is unset: the guard lifecycle
/// at debug, everything else quiet.
const TEST_DIRECTIVES: &str = "warn,procguard=debug";

/// Upper bound for any single awaited step in a test.
pub const TEST_DEADLINE: Duration = Duration::from_secs(10);

/// Install a per-test subscriber filtered by `PROCGUARD_LOG`, the same
/// directives the binary accepts (e.g. `procguard[guard{name=web}]=trace`).
///
/// Output goes through `with_test_writer()`, so it only shows for failing
/// tests unless run with `--nocapture`. Safe to call from every test; only
/// the first call in a test binary installs anything.
pub fn init_tracing() {
    let env = std::env::var(LOG_ENV).ok();
    let filter = match env.as_deref() {
        Some(_) => env_filter(None, env.as_deref()).unwrap_or_else(|e| {
            eprintln!("ignoring {LOG_ENV}: {e:#}");
            EnvFilter::new(TEST_DIRECTIVES)
        }),
        None => EnvFilter::new(TEST_DIRECTIVES),
    };

    let _ = fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_target(false)
        .try_init();
}

/// Await `f`, failing the test if it takes longer than [`TEST_DEADLINE`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_DEADLINE, f).await {
        Ok(value) => value,
        Err(_) => panic!("test step did not finish within {TEST_DEADLINE:?}"),
    }
}
