// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle event construction and publication.

use crate::job::LeasedJob;
use sc_core::{Clock, QueueEventKind, QueueJobId, RawQueueEvent, RunId, SystemClock, Trigger};

/// Build an event for a job we hold full context for.
pub fn event_for(job: &LeasedJob, kind: QueueEventKind) -> RawQueueEvent {
    build(kind, &job.queue, job.queue_job_id.clone(), job.run_id, job.trigger)
}

pub fn build(
    kind: QueueEventKind,
    queue: &str,
    queue_job_id: QueueJobId,
    run_id: Option<RunId>,
    trigger: Option<Trigger>,
) -> RawQueueEvent {
    RawQueueEvent {
        queue: queue.to_string(),
        kind,
        queue_job_id,
        run_id,
        trigger,
        epoch_ms: SystemClock.epoch_ms(),
        return_value: None,
        failed_reason: None,
        retries_exhausted: false,
    }
}
