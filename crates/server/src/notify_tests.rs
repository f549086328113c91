// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex;
use sc_core::{QueueEventKind, QueueJobId, RawQueueEvent, Trigger};
use sc_store::{MemoryStore, NewRun, Store};
use std::time::Duration;

struct Recording {
    seen: Arc<Mutex<Vec<(RunId, RunStatus)>>>,
    fail: bool,
}

#[async_trait]
impl NotifyHook for Recording {
    async fn run_terminal(
        &self,
        run_id: RunId,
        _project_id: Uuid,
        status: RunStatus,
    ) -> Result<(), String> {
        self.seen.lock().push((run_id, status));
        if self.fail {
            Err("smtp down".to_string())
        } else {
            Ok(())
        }
    }
}

async fn seeded_run(store: &MemoryStore) -> sc_core::Run {
    let (tenant_id, project_id) = store.seed_tenant();
    store
        .create_run(NewRun {
            tenant_id,
            project_id,
            job_id: None,
            trigger: Trigger::Api,
            location: sc_core::Location::Global,
            metadata: sc_core::RunMetadata::default(),
        })
        .await
        .unwrap()
}

fn completed_event(run_id: RunId, success: bool) -> RawQueueEvent {
    RawQueueEvent {
        queue: "playwright-exec-us-east".to_string(),
        kind: QueueEventKind::Completed,
        queue_job_id: QueueJobId::new(),
        run_id: Some(run_id),
        trigger: Some(Trigger::Api),
        epoch_ms: 1,
        return_value: Some(serde_json::json!({"success": success})),
        failed_reason: None,
        retries_exhausted: false,
    }
}

#[tokio::test]
async fn terminal_events_reach_every_hook_even_when_one_fails() {
    let store = Arc::new(MemoryStore::new());
    let run = seeded_run(&store).await;
    let hub = EventHub::new();
    let shutdown = CancellationToken::new();

    let seen_ok = Arc::new(Mutex::new(Vec::new()));
    let seen_bad = Arc::new(Mutex::new(Vec::new()));
    let hooks: Vec<Arc<dyn NotifyHook>> = vec![
        Arc::new(Recording { seen: Arc::clone(&seen_bad), fail: true }),
        Arc::new(Recording { seen: Arc::clone(&seen_ok), fail: false }),
    ];
    let task = spawn_notifier(&hub, store, hooks, shutdown.clone());

    hub.publish(completed_event(run.id, true));

    // The failing hook must not starve the healthy one.
    for _ in 0..50 {
        if !seen_ok.lock().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(*seen_ok.lock(), vec![(run.id, RunStatus::Passed)]);
    assert_eq!(*seen_bad.lock(), vec![(run.id, RunStatus::Passed)]);

    shutdown.cancel();
    let _ = task.await;
}

#[tokio::test]
async fn non_terminal_events_are_ignored() {
    let store = Arc::new(MemoryStore::new());
    let run = seeded_run(&store).await;
    let hub = EventHub::new();
    let shutdown = CancellationToken::new();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let hooks: Vec<Arc<dyn NotifyHook>> =
        vec![Arc::new(Recording { seen: Arc::clone(&seen), fail: false })];
    let task = spawn_notifier(&hub, store, hooks, shutdown.clone());

    let mut active = completed_event(run.id, true);
    active.kind = QueueEventKind::Active;
    active.return_value = None;
    hub.publish(active);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(seen.lock().is_empty());

    shutdown.cancel();
    let _ = task.await;
}
