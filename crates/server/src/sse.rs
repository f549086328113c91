// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-connection SSE plumbing.
//!
//! Each connection owns a hub subscription, a bounded run-lookup cache for
//! per-event authorization, and a pump task that serializes events into
//! the response. Dropping the response tears all of it down.

use axum::response::sse::Event;
use sc_core::{NormalizedQueueEvent, RunId};
use sc_store::{Store, StoreError};
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

/// Heartbeat cadence (`: ping`).
pub const HEARTBEAT: std::time::Duration = std::time::Duration::from_secs(30);

/// Cap on per-connection cached run lookups.
const LOOKUP_CACHE_CAPACITY: usize = 1024;

/// The slice of a run the gateway needs for authorization and filtering.
#[derive(Debug, Clone, Copy)]
pub struct CachedRun {
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub test_id: Option<Uuid>,
}

/// Bounded per-connection lookup cache (insertion-order eviction).
pub struct RunLookupCache {
    map: HashMap<RunId, Option<CachedRun>>,
    order: VecDeque<RunId>,
}

impl RunLookupCache {
    pub fn new() -> Self {
        Self { map: HashMap::new(), order: VecDeque::new() }
    }

    /// Resolve a run's scope, hitting the store once per run per
    /// connection. Missing runs are cached as missing.
    pub async fn resolve<S: Store + ?Sized>(
        &mut self,
        store: &S,
        run_id: RunId,
    ) -> Result<Option<CachedRun>, StoreError> {
        if let Some(cached) = self.map.get(&run_id) {
            return Ok(*cached);
        }
        let fetched = store.run(run_id).await?.map(|run| CachedRun {
            tenant_id: run.tenant_id,
            project_id: run.project_id,
            test_id: run.metadata.test_id,
        });
        self.map.insert(run_id, fetched);
        self.order.push_back(run_id);
        if self.order.len() > LOOKUP_CACHE_CAPACITY {
            if let Some(evicted) = self.order.pop_front() {
                self.map.remove(&evicted);
            }
        }
        Ok(fetched)
    }
}

impl Default for RunLookupCache {
    fn default() -> Self {
        Self::new()
    }
}

/// `: connected` hello, sent first on every stream.
pub fn connected_event() -> Event {
    Event::default().comment("connected")
}

pub fn status_event(event: &NormalizedQueueEvent, extra: Option<serde_json::Value>) -> Event {
    let mut data = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
    if let (Some(object), Some(extra)) = (data.as_object_mut(), extra) {
        if let Some(extra) = extra.as_object() {
            for (key, value) in extra {
                object.insert(key.clone(), value.clone());
            }
        }
    }
    Event::default().event("status").data(data.to_string())
}

pub fn snapshot_event(data: serde_json::Value) -> Event {
    Event::default().event("snapshot").data(data.to_string())
}

/// Synthetic overflow marker so clients know to reconcile.
pub fn dropped_event(count: u64) -> Event {
    Event::default()
        .event("dropped")
        .data(serde_json::json!({ "dropped": count }).to_string())
}

#[cfg(test)]
#[path = "sse_tests.rs"]
mod tests;
