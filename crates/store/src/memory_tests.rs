// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Contract tests for the store semantics, exercised via [`MemoryStore`].

use super::*;
use crate::{UsageKind, ACTIVE_STATUSES};
use sc_core::{Location, RunMetadata, Trigger};

fn new_run(store: &MemoryStore) -> (Uuid, Uuid, NewRun) {
    let (tenant_id, project_id) = store.seed_tenant();
    (
        tenant_id,
        project_id,
        NewRun {
            tenant_id,
            project_id,
            job_id: None,
            trigger: Trigger::Api,
            location: Location::UsEast,
            metadata: RunMetadata::default(),
        },
    )
}

#[tokio::test]
async fn create_run_starts_queued() {
    let store = MemoryStore::new();
    let (_, _, new) = new_run(&store);
    let run = store.create_run(new).await.unwrap();
    assert_eq!(run.status, RunStatus::Queued);
    assert!(run.completed_at.is_none());
    assert!(run.is_consistent());
}

#[tokio::test]
async fn transition_happy_path_sets_completed_at() {
    let store = MemoryStore::new();
    let (_, _, new) = new_run(&store);
    let run = store.create_run(new).await.unwrap();

    let run = store
        .transition_run(run.id, RunStatus::Queued, RunStatus::Running, RunPatch::default())
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::Running);
    assert!(run.completed_at.is_none());

    let run = store
        .transition_run(run.id, RunStatus::Running, RunStatus::Passed, RunPatch::default())
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::Passed);
    assert!(run.completed_at.is_some());
    assert!(run.duration_ms.is_some());
    assert!(run.is_consistent());
}

#[tokio::test]
async fn transition_from_wrong_state_is_conflict() {
    let store = MemoryStore::new();
    let (_, _, new) = new_run(&store);
    let run = store.create_run(new).await.unwrap();

    let err = store
        .transition_run(run.id, RunStatus::Running, RunStatus::Passed, RunPatch::default())
        .await
        .unwrap_err();
    match err {
        StoreError::StateConflict { expected, current } => {
            assert_eq!(expected, RunStatus::Running);
            assert_eq!(current, RunStatus::Queued);
        }
        other => panic!("expected StateConflict, got {other:?}"),
    }
}

#[tokio::test]
async fn terminal_transition_is_idempotent_conflict() {
    // Second terminal write (stalled redelivery) fails with StateConflict,
    // which the worker treats as success.
    let store = MemoryStore::new();
    let (_, _, new) = new_run(&store);
    let run = store.create_run(new).await.unwrap();
    store
        .transition_run(run.id, RunStatus::Queued, RunStatus::Running, RunPatch::default())
        .await
        .unwrap();
    store
        .transition_run(run.id, RunStatus::Running, RunStatus::Passed, RunPatch::default())
        .await
        .unwrap();

    let err = store
        .transition_run(run.id, RunStatus::Running, RunStatus::Failed, RunPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::StateConflict { .. }));
    // The first terminal status survived.
    assert_eq!(store.run_snapshot(run.id).unwrap().status, RunStatus::Passed);
}

#[tokio::test]
async fn cancel_never_overwrites_terminal() {
    let store = MemoryStore::new();
    let (_, _, new) = new_run(&store);
    let run = store.create_run(new).await.unwrap();
    store
        .transition_run(run.id, RunStatus::Queued, RunStatus::Running, RunPatch::default())
        .await
        .unwrap();
    store
        .transition_run(run.id, RunStatus::Running, RunStatus::Passed, RunPatch::default())
        .await
        .unwrap();

    let cancelled = store.cancel_run(run.id).await.unwrap();
    assert!(cancelled.is_none(), "terminal status wins over cancel");
    assert_eq!(store.run_snapshot(run.id).unwrap().status, RunStatus::Passed);
}

#[tokio::test]
async fn cancel_from_queued_works() {
    let store = MemoryStore::new();
    let (_, _, new) = new_run(&store);
    let run = store.create_run(new).await.unwrap();
    let cancelled = store.cancel_run(run.id).await.unwrap().unwrap();
    assert_eq!(cancelled.status, RunStatus::Cancelled);
    assert!(cancelled.completed_at.is_some());
}

#[tokio::test]
async fn counts_are_scoped_by_project_and_status() {
    let store = MemoryStore::new();
    let (_, project_a, new_a) = new_run(&store);
    let (_, _project_b, new_b) = new_run(&store);
    store.create_run(new_a.clone()).await.unwrap();
    let run = store.create_run(new_a).await.unwrap();
    store.create_run(new_b).await.unwrap();

    store
        .transition_run(run.id, RunStatus::Queued, RunStatus::Running, RunPatch::default())
        .await
        .unwrap();

    assert_eq!(store.count_runs(project_a, &[RunStatus::Queued]).await.unwrap(), 1);
    assert_eq!(store.count_runs(project_a, &[RunStatus::Running]).await.unwrap(), 1);
    assert_eq!(store.count_runs(project_a, &ACTIVE_STATUSES).await.unwrap(), 2);
}

#[tokio::test]
async fn queued_position_counts_earlier_runs() {
    let store = MemoryStore::new();
    let (_, project_id, new) = new_run(&store);
    let first = store.create_run(new.clone()).await.unwrap();
    let second = store.create_run(new.clone()).await.unwrap();
    let third = store.create_run(new).await.unwrap();

    assert_eq!(store.queued_position(project_id, first.id).await.unwrap(), 0);
    assert_eq!(store.queued_position(project_id, second.id).await.unwrap(), 1);
    assert_eq!(store.queued_position(project_id, third.id).await.unwrap(), 2);

    // Leasing the first run shrinks later positions.
    store
        .transition_run(first.id, RunStatus::Queued, RunStatus::Running, RunPatch::default())
        .await
        .unwrap();
    assert_eq!(store.queued_position(project_id, third.id).await.unwrap(), 1);
}

#[tokio::test]
async fn usage_events_dedupe_on_tenant_run_kind() {
    let store = MemoryStore::new();
    let (tenant_id, _) = store.seed_tenant();
    let run_id = Uuid::new_v4();
    let event = NewUsageEvent {
        tenant_id,
        window_id: "202608".to_string(),
        kind: UsageKind::ExecutionMinutes,
        units: 3,
        run_id: Some(run_id),
    };
    assert!(store.insert_usage_event(event.clone()).await.unwrap());
    assert!(!store.insert_usage_event(event.clone()).await.unwrap(), "duplicate must be dropped");

    // Different kind under the same run is a separate event.
    let credits = NewUsageEvent { kind: UsageKind::AiCredits, ..event };
    assert!(store.insert_usage_event(credits).await.unwrap());
}

#[tokio::test]
async fn usage_sync_marks_rows() {
    let store = MemoryStore::new();
    let (tenant_id, _) = store.seed_tenant();
    store
        .insert_usage_event(NewUsageEvent {
            tenant_id,
            window_id: "202608".to_string(),
            kind: UsageKind::ExecutionMinutes,
            units: 1,
            run_id: None,
        })
        .await
        .unwrap();

    let pending = store.unsynced_usage_events(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    store.mark_usage_synced(&[pending[0].id]).await.unwrap();
    assert!(store.unsynced_usage_events(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn plan_limits_default_to_free_tier() {
    let store = MemoryStore::new();
    let (tenant_id, _) = store.seed_tenant();
    assert_eq!(store.plan_limits(tenant_id).await.unwrap(), PlanLimits::free_tier());

    let custom = PlanLimits { running_capacity: 10, ..PlanLimits::free_tier() };
    store.set_plan_limits(tenant_id, custom.clone());
    assert_eq!(store.plan_limits(tenant_id).await.unwrap(), custom);
}

#[tokio::test]
async fn token_lookup() {
    let store = MemoryStore::new();
    let (tenant_id, project_id) = store.seed_tenant();
    let identity = TokenIdentity { tenant_id, project_id };
    store.seed_token("hash-abc", identity.clone());
    assert_eq!(store.identity_for_token_hash("hash-abc").await.unwrap(), Some(identity));
    assert_eq!(store.identity_for_token_hash("hash-zzz").await.unwrap(), None);
}
