// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler-queue consumer.
//!
//! Drains `{playwright|k6|monitor}-scheduler` and expands each scheduled
//! bundle into run submissions through the normal admission path, so
//! scheduled runs honor the same capacity and subscription gates as
//! interactive ones.

use crate::state::AppState;
use sc_admission::SubmitRequest;
use sc_core::{ExecKind, QueueName, RunMetadata, TestType, Trigger, WorkerId};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerTask {
    pub job_id: Uuid,
}

const VISIBILITY: Duration = Duration::from_secs(60);

pub async fn run_scheduler(state: AppState, shutdown: CancellationToken) {
    let queues: Vec<String> = ExecKind::ALL
        .iter()
        .map(|kind| QueueName::scheduler(*kind).to_string())
        .collect();
    let consumer_id = WorkerId::new();
    tracing::info!(consumer = %consumer_id, "scheduler consumer started");

    loop {
        let leased = tokio::select! {
            _ = shutdown.cancelled() => return,
            leased = state.substrate.lease(&queues, &consumer_id, VISIBILITY) => leased,
        };
        let job = match leased {
            Ok(Some(job)) => job,
            Ok(None) => {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = tokio::time::sleep(Duration::from_secs(1)) => continue,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "scheduler lease failed");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        let task: SchedulerTask = match serde_json::from_value(job.payload.clone()) {
            Ok(task) => task,
            Err(e) => {
                tracing::error!(error = %e, "bad scheduler task dropped");
                let _ = state.substrate.nack(&job, false, "bad scheduler task").await;
                continue;
            }
        };
        let submitted = expand(&state, &task).await;
        let value = serde_json::json!({"success": true, "submitted": submitted});
        if let Err(e) = state.substrate.ack(&job, Some(value)).await {
            tracing::warn!(error = %e, "scheduler ack failed");
        }
    }
}

/// Submit one run per test in the bundle. Failures are logged, not
/// raised — one full project must not wedge the scheduler.
async fn expand(state: &AppState, task: &SchedulerTask) -> usize {
    let jobs = match state.store.scheduled_jobs().await {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::error!(error = %e, "scheduled job load failed");
            return 0;
        }
    };
    let Some(job) = jobs.into_iter().find(|j| j.id == task.job_id) else {
        tracing::warn!(job = %task.job_id, "scheduled job vanished before expansion");
        return 0;
    };

    let test_type = match job.job_type {
        sc_core::JobType::Browser => TestType::Browser,
        sc_core::JobType::Performance => TestType::Performance,
    };
    let mut submitted = 0usize;
    for test_id in &job.test_ids {
        let request = SubmitRequest {
            tenant_id: job.tenant_id,
            project_id: job.project_id,
            test_type,
            script_b64: None,
            test_id: Some(*test_id),
            location: Some(job.location.to_string()),
            trigger: Trigger::Scheduled,
            metadata: RunMetadata::default(),
            timeout_ms: None,
            credit_units: None,
            job_id: Some(job.id),
        };
        match state.admission.submit(request).await {
            Ok(outcome) => {
                submitted += 1;
                tracing::info!(
                    job = %job.id,
                    test = %test_id,
                    run = %outcome.run.id,
                    "scheduled run admitted"
                );
            }
            Err(e) => {
                tracing::warn!(job = %job.id, test = %test_id, error = %e, "scheduled run rejected");
            }
        }
    }
    submitted
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
