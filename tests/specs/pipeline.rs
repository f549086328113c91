// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submit → lease → execute → settle, observed end to end, including the
//! hub-normalized event order a subscriber would see.

use super::harness::{probe_request, serve_status, Backbone};
use sc_core::{Location, RunStatus};
use sc_server::hub::{EventHub, HubMessage};
use sc_server::Subscription;
use sc_store::Store as _;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn next_status(sub: &mut Subscription) -> Option<RunStatus> {
    loop {
        match tokio::time::timeout(Duration::from_secs(2), sub.recv()).await {
            Ok(HubMessage::Event(event)) => return Some(event.status),
            Ok(HubMessage::Dropped(_)) => continue,
            Err(_) => return None,
        }
    }
}

#[tokio::test]
async fn a_run_flows_queued_running_passed_in_order() {
    let backbone = Backbone::new();
    let url = serve_status("200 OK").await;

    // An app node's hub, attached before submission.
    let hub = EventHub::new();
    let shutdown = CancellationToken::new();
    let pump = hub.attach(Arc::clone(&backbone.substrate), shutdown.clone());
    tokio::time::sleep(Duration::from_millis(50)).await;
    let mut subscriber = hub.subscribe();

    let outcome = backbone.admission.submit(probe_request(&backbone, &url)).await.expect("admit");
    assert_eq!(outcome.run.status, RunStatus::Queued);
    assert_eq!(outcome.position, 0);

    let pool = backbone.pool(Location::UsEast);
    let worker_shutdown = CancellationToken::new();
    let worker = tokio::spawn(Arc::clone(&pool).run(worker_shutdown.clone()));

    let settled = backbone.wait_terminal(outcome.run.id).await;
    assert_eq!(settled.status, RunStatus::Passed);
    assert!(settled.completed_at.expect("completed_at") >= settled.started_at);
    assert!(settled.duration_ms.is_some());

    // Per-run ordering: queued → running → passed, no regressions.
    let mut seen = Vec::new();
    while let Some(status) = next_status(&mut subscriber).await {
        seen.push(status);
        if status.is_terminal() {
            break;
        }
    }
    assert_eq!(seen, vec![RunStatus::Queued, RunStatus::Running, RunStatus::Passed]);

    worker_shutdown.cancel();
    worker.await.expect("worker join");
    shutdown.cancel();
    let _ = pump.await;
}

#[tokio::test]
async fn a_failing_endpoint_settles_failed_not_error() {
    let backbone = Backbone::new();
    let url = serve_status("500 Internal Server Error").await;
    let outcome = backbone.admission.submit(probe_request(&backbone, &url)).await.expect("admit");

    let pool = backbone.pool(Location::UsEast);
    let shutdown = CancellationToken::new();
    let worker = tokio::spawn(Arc::clone(&pool).run(shutdown.clone()));

    let settled = backbone.wait_terminal(outcome.run.id).await;
    assert_eq!(settled.status, RunStatus::Failed);
    assert!(settled.error_details.expect("details").contains("500"));

    shutdown.cancel();
    worker.await.expect("worker join");
}

#[tokio::test]
async fn minutes_are_recorded_once_per_run() {
    let backbone = Backbone::new();
    let url = serve_status("200 OK").await;
    let outcome = backbone.admission.submit(probe_request(&backbone, &url)).await.expect("admit");

    let pool = backbone.pool(Location::UsEast);
    let shutdown = CancellationToken::new();
    let worker = tokio::spawn(Arc::clone(&pool).run(shutdown.clone()));
    backbone.wait_terminal(outcome.run.id).await;
    shutdown.cancel();
    worker.await.expect("worker join");

    let events = backbone.store.unsynced_usage_events(10).await.expect("usage");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].run_id, Some(outcome.run.id.as_uuid()));
    assert!(events[0].units >= 1);
}
