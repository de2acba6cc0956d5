// tests/log_capture.rs
#![cfg(unix)]

mod common;
use crate::common::{RecordingHooks, ShellInstall, init_tracing, script, with_timeout};

use std::sync::Arc;

use procguard::guard::Guard;
use procguard::types::{OutputEncoding, OutputStream, Priority};

/// Every line of both streams lands in the log exactly once, and each
/// stream keeps its own order.
#[tokio::test]
async fn log_holds_both_streams_in_per_stream_order() {
    init_tracing();
    let install = ShellInstall::new();
    let hooks = Arc::new(RecordingHooks::new());
    let spec = install.spec("chatty").started_keywords(["DONE"]);
    let mut guard = Guard::with_hooks(install.layout(), spec, hooks.clone()).unwrap();

    let body = "for i in 1 2 3 4 5 6 7 8 9 10; do echo out-$i; echo err-$i >&2; done; \
                sleep 0.2; echo DONE; exec sleep 60";
    with_timeout(guard.start(script(body), Priority::Normal))
        .await
        .unwrap();

    let log = install
        .wait_for_log("chatty", |log| log.lines().count() == 21)
        .await;
    let lines: Vec<&str> = log.lines().collect();

    let outs: Vec<&str> = lines.iter().copied().filter(|l| l.starts_with("out-")).collect();
    let errs: Vec<&str> = lines.iter().copied().filter(|l| l.starts_with("err-")).collect();
    let expected_out: Vec<String> = (1..=10).map(|i| format!("out-{i}")).collect();
    let expected_err: Vec<String> = (1..=10).map(|i| format!("err-{i}")).collect();
    assert_eq!(outs, expected_out);
    assert_eq!(errs, expected_err);
    assert_eq!(lines.iter().filter(|l| **l == "DONE").count(), 1);

    // Hooks run right after the log write, so give the last one a moment.
    with_timeout(async {
        while hooks.lines().len() < 21 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await;
    assert_eq!(hooks.lines_from(OutputStream::Stdout).len(), 11);
    assert_eq!(hooks.lines_from(OutputStream::Stderr), expected_err);

    guard.stop().await;
}

#[tokio::test]
async fn latin1_output_is_decoded_before_matching() {
    init_tracing();
    let install = ShellInstall::new();
    let hooks = Arc::new(RecordingHooks::new());
    let spec = install
        .spec("legacy")
        .encoding(OutputEncoding::Latin1)
        .started_keywords(["prêt"]);
    let mut guard = Guard::with_hooks(install.layout(), spec, hooks.clone()).unwrap();

    // 0xEA is 'ê' in ISO-8859-1.
    with_timeout(guard.start(script("printf 'pr\\352t\\n'; exec sleep 60"), Priority::Normal))
        .await
        .unwrap();

    // The matching line was classified, so its hook call has happened.
    assert_eq!(
        hooks.lines_from(OutputStream::Stdout),
        vec!["prêt".to_string()]
    );
    let log = install.wait_for_log("legacy", |log| !log.is_empty()).await;
    assert_eq!(log, "prêt\n");

    guard.stop().await;
}

#[tokio::test]
async fn log_is_closed_after_stop() {
    init_tracing();
    let install = ShellInstall::new();
    let mut guard = Guard::new(install.layout(), install.spec("closing")).unwrap();

    with_timeout(guard.start(script("echo first; exec sleep 60"), Priority::Normal))
        .await
        .unwrap();
    install.wait_for_log("closing", |log| log.contains("first")).await;
    guard.stop().await;

    // The lock was released, so another sink can take the file over.
    let sink = procguard::guard::LogSink::create(&install.log_path("closing")).unwrap();
    sink.write_line("second");
    sink.close();
    assert_eq!(install.log_contents("closing"), "second\n");
}
