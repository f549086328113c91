// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data-lifecycle retention sweep.
//!
//! Consumes the `data-lifecycle` queue. Each task names one tenant; runs
//! past the plan's retention horizon are deleted (artifacts age out via
//! bucket policy, which is why buckets are split by entity type).

use crate::WorkerError;
use sc_store::Store;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupTask {
    pub tenant_id: Uuid,
    pub retention_days: i64,
}

pub async fn handle<S: Store>(store: &S, task: &CleanupTask) -> Result<u64, WorkerError> {
    let expired = store.expired_run_ids(task.tenant_id, task.retention_days.max(1)).await?;
    if expired.is_empty() {
        return Ok(0);
    }
    let deleted = store.delete_runs(&expired).await?;
    tracing::info!(
        tenant = %task.tenant_id,
        retention_days = task.retention_days,
        deleted,
        "retention sweep complete"
    );
    Ok(deleted)
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
