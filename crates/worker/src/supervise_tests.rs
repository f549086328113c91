// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sc_queue::{CancelPlane, MemoryCancelPlane};

fn sh_spec(script: &str) -> ChildSpec {
    // /bin/sh is the test harness here, not an execution path: production
    // runners always exec their binary directly with an argv array.
    ChildSpec::new("/bin/sh", std::env::temp_dir())
        .arg("-c")
        .arg(script)
        .timeout(Duration::from_secs(10))
}

#[tokio::test]
async fn captures_exit_code_and_output() {
    let cancel = MemoryCancelPlane::new();
    let end = supervise(sh_spec("echo out; echo err >&2; exit 3"), RunId::generate(), &cancel)
        .await
        .unwrap();
    match end {
        SuperviseEnd::Exited { exit_code, stdout, stderr, .. } => {
            assert_eq!(exit_code, 3);
            assert_eq!(stdout.trim(), "out");
            assert_eq!(stderr.trim(), "err");
        }
        other => panic!("expected Exited, got {other:?}"),
    }
}

#[tokio::test]
async fn times_out_long_children() {
    let cancel = MemoryCancelPlane::new();
    let mut spec = sh_spec("sleep 30");
    spec.timeout = Duration::from_millis(200);
    spec.kill_grace = Duration::from_millis(200);
    let started = std::time::Instant::now();
    let end = supervise(spec, RunId::generate(), &cancel).await.unwrap();
    assert!(matches!(end, SuperviseEnd::TimedOut { .. }));
    assert!(started.elapsed() < Duration::from_secs(5), "timeout must not wait for the child");
}

#[tokio::test]
async fn pre_set_cancel_skips_the_spawn() {
    let cancel = MemoryCancelPlane::new();
    let run_id = RunId::generate();
    cancel.signal(run_id).await.unwrap();
    let end = supervise(sh_spec("echo should-not-run"), run_id, &cancel).await.unwrap();
    match end {
        SuperviseEnd::Cancelled { stdout, .. } => assert!(stdout.is_empty()),
        other => panic!("expected Cancelled, got {other:?}"),
    }
}

#[tokio::test]
async fn cancel_during_execution_is_observed_within_the_poll_interval() {
    let cancel = MemoryCancelPlane::new();
    let run_id = RunId::generate();
    let mut spec = sh_spec("sleep 30");
    spec.cancel_poll = Duration::from_millis(50);
    spec.kill_grace = Duration::from_millis(200);

    let plane = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        plane.signal(run_id).await.unwrap();
    });

    let started = std::time::Instant::now();
    let end = supervise(spec, run_id, &cancel).await.unwrap();
    assert!(matches!(end, SuperviseEnd::Cancelled { .. }));
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "cancellation must land within poll + grace"
    );
}

#[tokio::test]
async fn sigterm_is_tried_before_sigkill() {
    let cancel = MemoryCancelPlane::new();
    let run_id = RunId::generate();
    // The child traps SIGTERM and exits cleanly with 0.
    let mut spec = sh_spec("trap 'exit 0' TERM; sleep 30 & wait");
    spec.cancel_poll = Duration::from_millis(50);
    spec.kill_grace = Duration::from_secs(5);
    cancel.signal(run_id).await.unwrap();

    // Pre-set cancel short-circuits, so signal after spawn instead: clear
    // then re-signal from a task.
    cancel.clear(run_id).await.unwrap();
    let plane = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        plane.signal(run_id).await.unwrap();
    });

    let end = supervise(spec, run_id, &cancel).await.unwrap();
    assert!(matches!(end, SuperviseEnd::Cancelled { .. }));
}

#[tokio::test]
async fn child_env_is_explicit() {
    let cancel = MemoryCancelPlane::new();
    std::env::set_var("SC_SUPERVISE_LEAK_TEST", "leaked");
    let spec = sh_spec("echo value=$SC_SUPERVISE_LEAK_TEST:$SC_INJECTED")
        .env_pairs(vec![("SC_INJECTED".to_string(), "yes".to_string())]);
    let end = supervise(spec, RunId::generate(), &cancel).await.unwrap();
    std::env::remove_var("SC_SUPERVISE_LEAK_TEST");
    // Parent env does not leak; explicit pairs do arrive.
    assert_eq!(end.stdout().trim(), "value=:yes");
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() {
    let cancel = MemoryCancelPlane::new();
    let spec = ChildSpec::new("/nonexistent/definitely-not-a-binary", std::env::temp_dir());
    let err = supervise(spec, RunId::generate(), &cancel).await.unwrap_err();
    assert!(matches!(err, WorkerError::Spawn(_)));
}
