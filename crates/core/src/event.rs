// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue lifecycle events.
//!
//! The substrate publishes a [`RawQueueEvent`] for every state change on a
//! single pub/sub channel; the per-node event hub turns it into a
//! [`NormalizedQueueEvent`] for SSE subscribers.

use crate::payload::QueueJobId;
use crate::run::{RunId, RunStatus, Trigger};
use serde::{Deserialize, Serialize};

/// Substrate-level state change kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueEventKind {
    Added,
    Waiting,
    Active,
    Completed,
    Failed,
    Stalled,
}

crate::simple_display! {
    QueueEventKind {
        Added => "added",
        Waiting => "waiting",
        Active => "active",
        Completed => "completed",
        Failed => "failed",
        Stalled => "stalled",
    }
}

/// Coarse grouping surfaced to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Job,
    Test,
}

crate::simple_display! {
    EventCategory {
        Job => "job",
        Test => "test",
    }
}

/// Event as published by the queue substrate.
///
/// Carried verbatim over the Redis lifecycle channel as JSON; any node may
/// subscribe without owning the job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawQueueEvent {
    pub queue: String,
    pub kind: QueueEventKind,
    pub queue_job_id: QueueJobId,
    /// The run this queue job executes, when known.
    pub run_id: Option<RunId>,
    pub trigger: Option<Trigger>,
    pub epoch_ms: u64,
    /// Runner result for `completed` events; `{"success": bool, ...}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<String>,
    /// True when a `failed` event is substrate-level (retries exhausted or
    /// non-retriable), as opposed to a runner-reported failure.
    #[serde(default)]
    pub retries_exhausted: bool,
}

/// Hub-normalized event, ready for SSE serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedQueueEvent {
    pub queue: String,
    pub category: EventCategory,
    pub event: QueueEventKind,
    /// Derived run status (see [`derive_status`]).
    pub status: RunStatus,
    pub queue_job_id: QueueJobId,
    pub run_id: Option<RunId>,
    pub trigger: Option<Trigger>,
    pub epoch_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<String>,
}

/// Map a raw event onto the run status it implies.
///
/// - `completed` → `passed`/`failed` based on the return value's
///   `success` boolean (missing or malformed counts as failed)
/// - `failed` → `error` when the failure is substrate-level, else `failed`
/// - `active` → `running`
/// - `waiting`/`added`/`stalled` → `queued`
pub fn derive_status(event: &RawQueueEvent) -> RunStatus {
    match event.kind {
        QueueEventKind::Completed => {
            let success = event
                .return_value
                .as_ref()
                .and_then(|v| v.get("success"))
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if success {
                RunStatus::Passed
            } else {
                RunStatus::Failed
            }
        }
        QueueEventKind::Failed => {
            if event.retries_exhausted {
                RunStatus::Error
            } else {
                RunStatus::Failed
            }
        }
        QueueEventKind::Active => RunStatus::Running,
        QueueEventKind::Added | QueueEventKind::Waiting | QueueEventKind::Stalled => {
            RunStatus::Queued
        }
    }
}

impl RawQueueEvent {
    /// One-line summary for structured logs.
    pub fn log_summary(&self) -> String {
        match &self.run_id {
            Some(run) => format!("{} queue={} job={} run={run}", self.kind, self.queue, self.queue_job_id),
            None => format!("{} queue={} job={}", self.kind, self.queue, self.queue_job_id),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
