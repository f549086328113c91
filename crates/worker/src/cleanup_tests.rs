// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sc_core::{Location, Run, RunMetadata, RunPatch, RunStatus, Trigger};
use sc_store::{MemoryStore, NewRun};

/// A terminal run for the tenant, completed just now.
async fn settled_run(store: &MemoryStore, tenant_id: uuid::Uuid, project_id: uuid::Uuid) -> Run {
    let run = store
        .create_run(NewRun {
            tenant_id,
            project_id,
            job_id: None,
            trigger: Trigger::Api,
            location: Location::Global,
            metadata: RunMetadata::default(),
        })
        .await
        .unwrap();
    store
        .transition_run(run.id, RunStatus::Queued, RunStatus::Running, RunPatch::default())
        .await
        .unwrap();
    store
        .transition_run(run.id, RunStatus::Running, RunStatus::Passed, RunPatch::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn expired_runs_are_deleted_and_fresh_ones_survive() {
    let store = MemoryStore::new();
    let (tenant_id, project_id) = store.seed_tenant();
    let old = settled_run(&store, tenant_id, project_id).await;
    let fresh = settled_run(&store, tenant_id, project_id).await;
    store.backdate_run(old.id, 60);

    let task = CleanupTask { tenant_id, retention_days: 30 };
    assert_eq!(handle(&store, &task).await.unwrap(), 1);
    assert!(store.run_snapshot(old.id).is_none());
    assert!(store.run_snapshot(fresh.id).is_some());
}

#[tokio::test]
async fn sweeps_are_idempotent() {
    let store = MemoryStore::new();
    let (tenant_id, project_id) = store.seed_tenant();
    let old = settled_run(&store, tenant_id, project_id).await;
    store.backdate_run(old.id, 60);

    let task = CleanupTask { tenant_id, retention_days: 30 };
    assert_eq!(handle(&store, &task).await.unwrap(), 1);
    assert_eq!(handle(&store, &task).await.unwrap(), 0, "nothing left to sweep");
}

#[tokio::test]
async fn active_runs_are_never_swept() {
    let store = MemoryStore::new();
    let (tenant_id, project_id) = store.seed_tenant();
    let run = store
        .create_run(NewRun {
            tenant_id,
            project_id,
            job_id: None,
            trigger: Trigger::Api,
            location: Location::Global,
            metadata: RunMetadata::default(),
        })
        .await
        .unwrap();
    store.backdate_run(run.id, 365);

    let task = CleanupTask { tenant_id, retention_days: 30 };
    assert_eq!(handle(&store, &task).await.unwrap(), 0);
    assert!(store.run_snapshot(run.id).is_some(), "queued runs have no completion to expire");
}

#[tokio::test]
async fn sweeps_are_tenant_scoped() {
    let store = MemoryStore::new();
    let (tenant_a, project_a) = store.seed_tenant();
    let (tenant_b, project_b) = store.seed_tenant();
    let a = settled_run(&store, tenant_a, project_a).await;
    let b = settled_run(&store, tenant_b, project_b).await;
    store.backdate_run(a.id, 60);
    store.backdate_run(b.id, 60);

    let task = CleanupTask { tenant_id: tenant_a, retention_days: 30 };
    assert_eq!(handle(&store, &task).await.unwrap(), 1);
    assert!(store.run_snapshot(a.id).is_none());
    assert!(store.run_snapshot(b.id).is_some(), "other tenants' runs are untouched");
}

#[tokio::test]
async fn zero_retention_is_clamped_to_one_day() {
    let store = MemoryStore::new();
    let (tenant_id, project_id) = store.seed_tenant();
    let today = settled_run(&store, tenant_id, project_id).await;
    let yesterday = settled_run(&store, tenant_id, project_id).await;
    store.backdate_run(yesterday.id, 2);

    let task = CleanupTask { tenant_id, retention_days: 0 };
    assert_eq!(handle(&store, &task).await.unwrap(), 1);
    assert!(store.run_snapshot(yesterday.id).is_none());
    assert!(store.run_snapshot(today.id).is_some(), "same-day runs survive the clamp");
}
