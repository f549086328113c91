// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation semantics: eventual, bounded, distinct from failure.

use super::harness::{probe_request, serve_status, Backbone};
use sc_core::{Location, RunStatus};
use sc_queue::{CancelPlane as _, Substrate as _};
use sc_store::Store as _;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn cancel_while_queued_settles_without_execution() {
    let backbone = Backbone::new();
    let outcome = backbone
        .admission
        .submit(probe_request(&backbone, "https://example.com"))
        .await
        .expect("admit");

    // The cancel API path: flag + queued→cancelled transition.
    backbone.cancel.signal(outcome.run.id).await.expect("signal");
    backbone.store.cancel_run(outcome.run.id).await.expect("cancel");

    // A worker arriving later must not resurrect the run.
    let pool = backbone.pool(Location::UsEast);
    let shutdown = CancellationToken::new();
    let worker = tokio::spawn(Arc::clone(&pool).run(shutdown.clone()));
    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown.cancel();
    worker.await.expect("worker join");

    let settled = backbone.store.run_snapshot(outcome.run.id).expect("run");
    assert_eq!(settled.status, RunStatus::Cancelled);
    assert_eq!(
        backbone.substrate.waiting_depth("monitor-exec-us-east").await.expect("depth"),
        0,
        "the queue job must be consumed, not left behind"
    );
}

#[tokio::test]
async fn cancel_mid_run_lands_within_poll_plus_grace() {
    let backbone = Backbone::new();
    // The probe runner checks the flag right after lease, so signalling
    // before the worker picks the job up exercises the observation path.
    let url = serve_status("200 OK").await;
    let outcome = backbone.admission.submit(probe_request(&backbone, &url)).await.expect("admit");
    backbone.cancel.signal(outcome.run.id).await.expect("signal");

    let pool = backbone.pool(Location::UsEast);
    let shutdown = CancellationToken::new();
    let worker = tokio::spawn(Arc::clone(&pool).run(shutdown.clone()));

    let settled = backbone.wait_terminal(outcome.run.id).await;
    assert_eq!(settled.status, RunStatus::Cancelled, "cancelled, never failed");

    shutdown.cancel();
    worker.await.expect("worker join");
}

#[tokio::test]
async fn terminal_status_wins_over_late_cancel() {
    let backbone = Backbone::new();
    let url = serve_status("200 OK").await;
    let outcome = backbone.admission.submit(probe_request(&backbone, &url)).await.expect("admit");

    let pool = backbone.pool(Location::UsEast);
    let shutdown = CancellationToken::new();
    let worker = tokio::spawn(Arc::clone(&pool).run(shutdown.clone()));
    let settled = backbone.wait_terminal(outcome.run.id).await;
    assert_eq!(settled.status, RunStatus::Passed);
    shutdown.cancel();
    worker.await.expect("worker join");

    // Cancel after the fact: the terminal status stands.
    backbone.cancel.signal(outcome.run.id).await.expect("signal");
    let cancelled = backbone.store.cancel_run(outcome.run.id).await.expect("cancel call");
    assert!(cancelled.is_none());
    assert_eq!(
        backbone.store.run_snapshot(outcome.run.id).expect("run").status,
        RunStatus::Passed
    );
}
