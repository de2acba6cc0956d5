#![allow(dead_code)]

pub use procguard_test_utils::builders::{ShellInstall, fast_policy, script};
pub use procguard_test_utils::recording_hooks::RecordingHooks;
pub use procguard_test_utils::{init_tracing, with_timeout};
