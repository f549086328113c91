// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron-only endpoints.
//!
//! An external scheduler hits `/internal/cron/tick` with the shared
//! secret. The tick fans scheduled job bundles into the scheduler queues
//! and seeds retention sweeps into the data-lifecycle queue.

use crate::error::ApiError;
use crate::scheduler::SchedulerTask;
use crate::state::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use sc_core::{QueueName, DATA_LIFECYCLE_QUEUE};
use sc_queue::EnqueueOpts;
use serde_json::json;

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// `POST /internal/cron/tick`
pub async fn tick(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(expected) = &state.config.cron_secret else {
        return Err(ApiError::forbidden("cron endpoints are disabled"));
    };
    let presented = headers
        .get(CRON_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if presented != expected {
        tracing::warn!("cron tick with a bad secret rejected");
        return Err(ApiError::forbidden("bad cron secret"));
    }

    // Scheduled bundles → scheduler queues.
    let jobs = state.store.scheduled_jobs().await?;
    let mut scheduled = 0usize;
    for job in &jobs {
        let queue = QueueName::scheduler(job.job_type.exec_kind()).to_string();
        let task = SchedulerTask { job_id: job.id };
        match serde_json::to_value(&task) {
            Ok(payload) => {
                if let Err(e) = state.substrate.enqueue(&queue, &payload, EnqueueOpts::default()).await
                {
                    tracing::warn!(job = %job.id, error = %e, "scheduler enqueue failed");
                } else {
                    scheduled += 1;
                }
            }
            Err(e) => tracing::error!(job = %job.id, error = %e, "scheduler task serialize failed"),
        }
    }

    // Tenants → retention sweeps.
    let mut sweeps = 0usize;
    for org in state.store.organizations().await? {
        let limits = state.store.plan_limits(org.id).await?;
        let task = json!({
            "tenant_id": org.id,
            "retention_days": limits.data_retention_days,
        });
        if let Err(e) =
            state.substrate.enqueue(DATA_LIFECYCLE_QUEUE, &task, EnqueueOpts::default()).await
        {
            tracing::warn!(tenant = %org.id, error = %e, "cleanup enqueue failed");
        } else {
            sweeps += 1;
        }
    }

    tracing::info!(scheduled, sweeps, "cron tick complete");
    Ok(Json(json!({"scheduled": scheduled, "cleanup": sweeps})))
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
