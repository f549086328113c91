// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory substrate for tests.
//!
//! Mirrors the Redis implementation's semantics (gate, delayed promotion,
//! visibility deadlines, attempt bookkeeping) without the server. Exported
//! under `test-support` for other crates' suites.

use crate::error::QueueError;
use crate::job::{Backoff, EnqueueOpts, LeasedJob};
use crate::{lifecycle, EventStream, Substrate};
use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::Mutex;
use sc_core::{Clock, QueueEventKind, QueueJobId, RawQueueEvent, RunId, SystemClock, Trigger, WorkerId};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

#[derive(Debug, Clone)]
struct StoredJob {
    payload: serde_json::Value,
    attempt: u32,
    max_attempts: u32,
    backoff: Backoff,
    run_id: Option<RunId>,
    trigger: Option<Trigger>,
}

#[derive(Default)]
struct QueueState {
    waiting: VecDeque<QueueJobId>,
    /// (deliver_at_ms, id)
    delayed: Vec<(u64, QueueJobId)>,
    /// id → visibility deadline
    active: HashMap<QueueJobId, u64>,
    jobs: HashMap<QueueJobId, StoredJob>,
    gate: Option<u32>,
}

/// Test double for the Redis substrate.
#[derive(Clone)]
pub struct MemorySubstrate<C: Clock = SystemClock> {
    state: Arc<Mutex<HashMap<String, QueueState>>>,
    events: broadcast::Sender<RawQueueEvent>,
    clock: C,
}

impl MemorySubstrate<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemorySubstrate<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemorySubstrate<C> {
    pub fn with_clock(clock: C) -> Self {
        let (events, _) = broadcast::channel(1024);
        Self { state: Arc::new(Mutex::new(HashMap::new())), events, clock }
    }

    fn publish(&self, mut event: RawQueueEvent) {
        event.epoch_ms = self.clock.epoch_ms();
        // No subscribers is fine; events are best-effort.
        let _ = self.events.send(event);
    }

    /// Number of jobs currently marked active (test inspection).
    pub fn active_count(&self, queue: &str) -> usize {
        self.state.lock().get(queue).map(|q| q.active.len()).unwrap_or(0)
    }

    /// Number of jobs parked in the delayed set (test inspection).
    pub fn delayed_count(&self, queue: &str) -> usize {
        self.state.lock().get(queue).map(|q| q.delayed.len()).unwrap_or(0)
    }
}

#[async_trait]
impl<C: Clock + 'static> Substrate for MemorySubstrate<C> {
    async fn enqueue(
        &self,
        queue: &str,
        payload: &serde_json::Value,
        opts: EnqueueOpts,
    ) -> Result<QueueJobId, QueueError> {
        let id = QueueJobId::new();
        let stored = StoredJob {
            payload: payload.clone(),
            attempt: 0,
            max_attempts: opts.attempts.max(1),
            backoff: opts.backoff,
            run_id: opts.run_id,
            trigger: opts.trigger,
        };
        let delayed_until = opts
            .delay
            .filter(|d| !d.is_zero())
            .map(|d| self.clock.epoch_ms() + d.as_millis() as u64);
        {
            let mut state = self.state.lock();
            let q = state.entry(queue.to_string()).or_default();
            q.jobs.insert(id.clone(), stored);
            match delayed_until {
                Some(at) => q.delayed.push((at, id.clone())),
                None => q.waiting.push_back(id.clone()),
            }
        }
        let kind = if delayed_until.is_some() {
            QueueEventKind::Added
        } else {
            QueueEventKind::Waiting
        };
        self.publish(lifecycle::build(kind, queue, id.clone(), opts.run_id, opts.trigger));
        Ok(id)
    }

    async fn lease(
        &self,
        queues: &[String],
        _worker: &WorkerId,
        visibility: Duration,
    ) -> Result<Option<LeasedJob>, QueueError> {
        let now = self.clock.epoch_ms();
        let deadline = now + visibility.as_millis() as u64;
        for queue in queues {
            let leased = {
                let mut state = self.state.lock();
                let Some(q) = state.get_mut(queue) else { continue };
                // Promote due delayed jobs.
                let (due, later): (Vec<_>, Vec<_>) =
                    q.delayed.drain(..).partition(|(at, _)| *at <= now);
                q.delayed = later;
                for (_, id) in due {
                    q.waiting.push_back(id);
                }
                if let Some(max) = q.gate {
                    if q.active.len() as u32 >= max {
                        continue;
                    }
                }
                let Some(id) = q.waiting.pop_front() else { continue };
                q.active.insert(id.clone(), deadline);
                let Some(job) = q.jobs.get_mut(&id) else { continue };
                job.attempt += 1;
                Some(LeasedJob {
                    queue: queue.clone(),
                    queue_job_id: id,
                    payload: job.payload.clone(),
                    attempt: job.attempt,
                    max_attempts: job.max_attempts,
                    backoff: job.backoff,
                    run_id: job.run_id,
                    trigger: job.trigger,
                })
            };
            if let Some(job) = leased {
                self.publish(lifecycle::event_for(&job, QueueEventKind::Active));
                return Ok(Some(job));
            }
        }
        Ok(None)
    }

    async fn ack(
        &self,
        job: &LeasedJob,
        return_value: Option<serde_json::Value>,
    ) -> Result<(), QueueError> {
        let was_active = {
            let mut state = self.state.lock();
            let Some(q) = state.get_mut(&job.queue) else {
                return Err(QueueError::JobNotFound(job.queue_job_id.to_string()));
            };
            let removed = q.active.remove(&job.queue_job_id).is_some();
            q.jobs.remove(&job.queue_job_id);
            removed
        };
        if was_active {
            let mut event = lifecycle::event_for(job, QueueEventKind::Completed);
            event.return_value = return_value;
            self.publish(event);
        }
        Ok(())
    }

    async fn nack(
        &self,
        job: &LeasedJob,
        retriable: bool,
        reason: &str,
    ) -> Result<(), QueueError> {
        let retry = retriable && job.attempt < job.max_attempts;
        {
            let mut state = self.state.lock();
            let Some(q) = state.get_mut(&job.queue) else {
                return Err(QueueError::JobNotFound(job.queue_job_id.to_string()));
            };
            q.active.remove(&job.queue_job_id);
            if retry {
                let deliver_at = self.clock.epoch_ms()
                    + job.backoff.delay_for(job.attempt).as_millis() as u64;
                q.delayed.push((deliver_at, job.queue_job_id.clone()));
            } else {
                q.jobs.remove(&job.queue_job_id);
            }
        }
        let mut event = if retry {
            lifecycle::event_for(job, QueueEventKind::Waiting)
        } else {
            lifecycle::event_for(job, QueueEventKind::Failed)
        };
        event.failed_reason = Some(reason.to_string());
        event.retries_exhausted = !retry && retriable;
        self.publish(event);
        Ok(())
    }

    async fn subscribe_events(&self) -> Result<EventStream, QueueError> {
        let rx = self.events.subscribe();
        let stream = BroadcastStream::new(rx).filter_map(|item| async move { item.ok() });
        Ok(Box::pin(stream))
    }

    async fn waiting_depth(&self, queue: &str) -> Result<u64, QueueError> {
        Ok(self.state.lock().get(queue).map(|q| q.waiting.len() as u64).unwrap_or(0))
    }

    async fn set_gate(&self, queue: &str, max_in_flight: Option<u32>) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        state.entry(queue.to_string()).or_default().gate = max_in_flight;
        Ok(())
    }

    async fn reclaim_stalled(&self, queue: &str) -> Result<u64, QueueError> {
        let now = self.clock.epoch_ms();
        let mut stalled = Vec::new();
        let mut dead = Vec::new();
        {
            let mut state = self.state.lock();
            let Some(q) = state.get_mut(queue) else { return Ok(0) };
            let expired: Vec<QueueJobId> = q
                .active
                .iter()
                .filter(|(_, deadline)| **deadline <= now)
                .map(|(id, _)| id.clone())
                .collect();
            for id in expired {
                q.active.remove(&id);
                let spent = q
                    .jobs
                    .get(&id)
                    .map(|j| j.attempt >= j.max_attempts)
                    .unwrap_or(true);
                if spent {
                    let job = q.jobs.remove(&id);
                    dead.push((id, job));
                } else {
                    q.waiting.push_back(id.clone());
                    let job = q.jobs.get(&id).cloned();
                    stalled.push((id, job));
                }
            }
        }
        let reclaimed = stalled.len() as u64;
        for (id, job) in stalled {
            let (run_id, trigger) =
                job.map(|j| (j.run_id, j.trigger)).unwrap_or((None, None));
            self.publish(lifecycle::build(QueueEventKind::Stalled, queue, id, run_id, trigger));
        }
        for (id, job) in dead {
            let (run_id, trigger) =
                job.map(|j| (j.run_id, j.trigger)).unwrap_or((None, None));
            let mut event = lifecycle::build(QueueEventKind::Failed, queue, id, run_id, trigger);
            event.failed_reason = Some("visibility expired, attempts exhausted".to_string());
            event.retries_exhausted = true;
            self.publish(event);
        }
        Ok(reclaimed)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
