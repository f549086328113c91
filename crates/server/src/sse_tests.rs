// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sc_store::MemoryStore;

#[tokio::test]
async fn cache_hits_the_store_once_per_run() {
    let store = MemoryStore::new();
    let (tenant_id, project_id) = store.seed_tenant();
    let run = store
        .create_run(sc_store::NewRun {
            tenant_id,
            project_id,
            job_id: None,
            trigger: sc_core::Trigger::Api,
            location: sc_core::Location::Global,
            metadata: sc_core::RunMetadata::default(),
        })
        .await
        .unwrap();

    let mut cache = RunLookupCache::new();
    let first = cache.resolve(&store, run.id).await.unwrap().unwrap();
    assert_eq!(first.project_id, project_id);

    // Delete behind the cache's back; the cached entry still answers.
    store.delete_runs(&[run.id]).await.unwrap();
    let second = cache.resolve(&store, run.id).await.unwrap();
    assert!(second.is_some(), "second resolve must come from the cache");
}

#[tokio::test]
async fn missing_runs_are_cached_as_missing() {
    let store = MemoryStore::new();
    let mut cache = RunLookupCache::new();
    let ghost = RunId::generate();
    assert!(cache.resolve(&store, ghost).await.unwrap().is_none());
    assert!(cache.resolve(&store, ghost).await.unwrap().is_none());
}
