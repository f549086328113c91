// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sc_core::{QueueEventKind, QueueJobId, RunStatus, Trigger};
use serde_json::json;
use std::time::Duration;

fn raw(kind: QueueEventKind, run_id: Option<RunId>) -> RawQueueEvent {
    RawQueueEvent {
        queue: "playwright-exec-us-east".to_string(),
        kind,
        queue_job_id: QueueJobId::new(),
        run_id,
        trigger: Some(Trigger::Manual),
        epoch_ms: 1,
        return_value: None,
        failed_reason: None,
        retries_exhausted: false,
    }
}

async fn recv_timeout(sub: &mut Subscription) -> Option<HubMessage> {
    tokio::time::timeout(Duration::from_millis(200), sub.recv()).await.ok()
}

#[tokio::test]
async fn events_reach_every_subscriber() {
    let hub = EventHub::new();
    let mut a = hub.subscribe();
    let mut b = hub.subscribe();
    assert_eq!(hub.subscriber_count(), 2);

    hub.publish(raw(QueueEventKind::Active, Some(RunId::generate())));

    for sub in [&mut a, &mut b] {
        match recv_timeout(sub).await {
            Some(HubMessage::Event(event)) => {
                assert_eq!(event.status, RunStatus::Running);
                assert_eq!(event.category, sc_core::EventCategory::Test);
            }
            other => panic!("expected event, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn dropping_a_subscription_unsubscribes() {
    let hub = EventHub::new();
    let sub = hub.subscribe();
    assert_eq!(hub.subscriber_count(), 1);
    drop(sub);
    assert_eq!(hub.subscriber_count(), 0);
}

#[tokio::test]
async fn status_regressions_are_dropped() {
    let hub = EventHub::new();
    let run = RunId::generate();
    let mut sub = hub.subscribe();

    let mut completed = raw(QueueEventKind::Completed, Some(run));
    completed.return_value = Some(json!({"success": true}));
    hub.publish(completed);
    // A late `active` after the terminal event must vanish.
    hub.publish(raw(QueueEventKind::Active, Some(run)));

    match recv_timeout(&mut sub).await {
        Some(HubMessage::Event(event)) => assert_eq!(event.status, RunStatus::Passed),
        other => panic!("expected passed event, got {other:?}"),
    }
    assert!(recv_timeout(&mut sub).await.is_none(), "regression must not be delivered");
}

#[tokio::test]
async fn forward_progress_is_not_dropped() {
    let hub = EventHub::new();
    let run = RunId::generate();
    let mut sub = hub.subscribe();

    hub.publish(raw(QueueEventKind::Waiting, Some(run)));
    hub.publish(raw(QueueEventKind::Active, Some(run)));
    let mut completed = raw(QueueEventKind::Completed, Some(run));
    completed.return_value = Some(json!({"success": true}));
    hub.publish(completed);

    let mut statuses = Vec::new();
    while let Some(HubMessage::Event(event)) = recv_timeout(&mut sub).await {
        statuses.push(event.status);
    }
    assert_eq!(statuses, vec![RunStatus::Queued, RunStatus::Running, RunStatus::Passed]);
}

#[tokio::test]
async fn slow_subscriber_loses_oldest_and_learns_about_it() {
    let hub = EventHub::new();
    let mut sub = hub.subscribe();

    // Overflow the bounded queue. Distinct runs keep the ordering guard out
    // of the picture.
    for _ in 0..(SUBSCRIBER_QUEUE_CAPACITY + 10) {
        hub.publish(raw(QueueEventKind::Active, Some(RunId::generate())));
    }

    match recv_timeout(&mut sub).await {
        Some(HubMessage::Dropped(n)) => assert_eq!(n, 10),
        other => panic!("expected Dropped, got {other:?}"),
    }
    // The remaining events are the newest capacity-many.
    let mut received = 0;
    while let Some(HubMessage::Event(_)) = recv_timeout(&mut sub).await {
        received += 1;
    }
    assert_eq!(received, SUBSCRIBER_QUEUE_CAPACITY);
}

#[tokio::test]
async fn one_slow_subscriber_does_not_block_a_fast_one() {
    let hub = EventHub::new();
    let _slow = hub.subscribe(); // never drained
    let mut fast = hub.subscribe();

    for _ in 0..(SUBSCRIBER_QUEUE_CAPACITY * 2) {
        hub.publish(raw(QueueEventKind::Active, Some(RunId::generate())));
    }
    // Fast subscriber still receives (newest window) promptly.
    assert!(recv_timeout(&mut fast).await.is_some());
}

#[tokio::test]
async fn attach_pumps_substrate_events() {
    use sc_queue::{EnqueueOpts, MemorySubstrate, Substrate as _};
    let hub = EventHub::new();
    let substrate = Arc::new(MemorySubstrate::new());
    let shutdown = CancellationToken::new();
    let pump = hub.attach(Arc::clone(&substrate), shutdown.clone());
    // Let the pump subscribe before publishing.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut sub = hub.subscribe();
    let run = RunId::generate();
    substrate
        .enqueue(
            "k6-exec-us-east",
            &json!({}),
            EnqueueOpts::with_run(run, Trigger::Scheduled),
        )
        .await
        .unwrap();

    match tokio::time::timeout(Duration::from_secs(2), sub.recv()).await {
        Ok(HubMessage::Event(event)) => {
            assert_eq!(event.run_id, Some(run));
            assert_eq!(event.status, RunStatus::Queued);
        }
        other => panic!("expected queued event, got {other:?}"),
    }
    shutdown.cancel();
    let _ = pump.await;
}
