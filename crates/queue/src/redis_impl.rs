// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-backed substrate implementation.

use crate::error::QueueError;
use crate::job::{Backoff, EnqueueOpts, LeasedJob};
use crate::{keys, lifecycle, scripts, EventStream, Substrate};
use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use sc_core::{Clock, QueueEventKind, QueueJobId, RunId, SystemClock, Trigger, WorkerId};
use std::time::Duration;

/// Production substrate. Cheap to clone; connections are multiplexed.
#[derive(Clone)]
pub struct RedisSubstrate {
    client: redis::Client,
    conn: ConnectionManager,
    lease: Script,
    ack: Script,
    nack: Script,
    reclaim: Script,
}

impl RedisSubstrate {
    pub async fn connect(url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client.clone()).await?;
        Ok(Self {
            client,
            conn,
            lease: Script::new(scripts::LEASE),
            ack: Script::new(scripts::ACK),
            nack: Script::new(scripts::NACK),
            reclaim: Script::new(scripts::RECLAIM),
        })
    }

    async fn publish(&self, event: &sc_core::RawQueueEvent) {
        let mut conn = self.conn.clone();
        match serde_json::to_string(event) {
            Ok(wire) => {
                let published: Result<i64, _> = conn.publish(keys::EVENTS_CHANNEL, wire).await;
                if let Err(e) = published {
                    tracing::warn!(error = %e, event = %event.log_summary(), "lifecycle publish failed");
                }
            }
            Err(e) => tracing::error!(error = %e, "lifecycle event serialization failed"),
        }
    }

    /// Load a leased job's record and bump its attempt counter.
    async fn load_job(
        &self,
        queue: &str,
        id: &QueueJobId,
    ) -> Result<Option<LeasedJob>, QueueError> {
        let mut conn = self.conn.clone();
        let job_key = keys::job(queue, id.as_str());
        let attempt: i64 = conn.hincr(&job_key, "attempt", 1).await?;
        let fields: std::collections::HashMap<String, String> = conn.hgetall(&job_key).await?;
        if fields.is_empty() {
            // Record vanished between pop and read (ack raced us); give up
            // on this id, the queue state is already consistent.
            return Ok(None);
        }
        let payload = fields
            .get("payload")
            .map(|raw| serde_json::from_str(raw))
            .transpose()?
            .unwrap_or(serde_json::Value::Null);
        let max_attempts =
            fields.get("max_attempts").and_then(|v| v.parse().ok()).unwrap_or(1u32);
        let backoff = Backoff {
            base_ms: fields.get("backoff_base_ms").and_then(|v| v.parse().ok()).unwrap_or(1_000),
            cap_ms: fields.get("backoff_cap_ms").and_then(|v| v.parse().ok()).unwrap_or(60_000),
        };
        let run_id = fields
            .get("run_id")
            .filter(|v| !v.is_empty())
            .and_then(|v| RunId::parse(v).ok());
        let trigger =
            fields.get("trigger").filter(|v| !v.is_empty()).and_then(|v| Trigger::parse(v));
        Ok(Some(LeasedJob {
            queue: queue.to_string(),
            queue_job_id: id.clone(),
            payload,
            attempt: attempt.max(1) as u32,
            max_attempts,
            backoff,
            run_id,
            trigger,
        }))
    }
}

#[async_trait]
impl Substrate for RedisSubstrate {
    async fn enqueue(
        &self,
        queue: &str,
        payload: &serde_json::Value,
        opts: EnqueueOpts,
    ) -> Result<QueueJobId, QueueError> {
        let mut conn = self.conn.clone();
        let id = QueueJobId::new();
        let job_key = keys::job(queue, id.as_str());
        let fields: Vec<(&str, String)> = vec![
            ("payload", serde_json::to_string(payload)?),
            ("attempt", "0".to_string()),
            ("max_attempts", opts.attempts.max(1).to_string()),
            ("backoff_base_ms", opts.backoff.base_ms.to_string()),
            ("backoff_cap_ms", opts.backoff.cap_ms.to_string()),
            ("run_id", opts.run_id.map(|r| r.to_string()).unwrap_or_default()),
            ("trigger", opts.trigger.map(|t| t.to_string()).unwrap_or_default()),
        ];
        let _: () = conn.hset_multiple(&job_key, &fields).await?;

        let mut event =
            lifecycle::build(QueueEventKind::Added, queue, id.clone(), opts.run_id, opts.trigger);
        match opts.delay {
            Some(delay) if !delay.is_zero() => {
                let deliver_at = SystemClock.epoch_ms() + delay.as_millis() as u64;
                let _: () = conn.zadd(keys::delayed(queue), id.as_str(), deliver_at).await?;
            }
            _ => {
                let _: () = conn.rpush(keys::waiting(queue), id.as_str()).await?;
                event.kind = QueueEventKind::Waiting;
            }
        }
        self.publish(&event).await;
        tracing::debug!(queue, queue_job_id = %id, "enqueued");
        Ok(id)
    }

    async fn lease(
        &self,
        queues: &[String],
        worker: &WorkerId,
        visibility: Duration,
    ) -> Result<Option<LeasedJob>, QueueError> {
        let mut conn = self.conn.clone();
        let now = SystemClock.epoch_ms();
        let deadline = now + visibility.as_millis() as u64;
        for queue in queues {
            let mut invocation = self.lease.prepare_invoke();
            invocation
                .key(keys::waiting(queue))
                .key(keys::delayed(queue))
                .key(keys::active(queue))
                .key(keys::gate(queue))
                .arg(now)
                .arg(deadline);
            let popped: Option<String> = invocation.invoke_async(&mut conn).await?;
            let Some(raw_id) = popped else { continue };
            let id = QueueJobId::from_string(raw_id);
            let Some(job) = self.load_job(queue, &id).await? else { continue };
            let event = lifecycle::event_for(&job, QueueEventKind::Active);
            self.publish(&event).await;
            tracing::debug!(queue, queue_job_id = %id, worker = %worker, attempt = job.attempt, "leased");
            return Ok(Some(job));
        }
        Ok(None)
    }

    async fn ack(
        &self,
        job: &LeasedJob,
        return_value: Option<serde_json::Value>,
    ) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let mut invocation = self.ack.prepare_invoke();
        invocation
            .key(keys::active(&job.queue))
            .key(keys::job(&job.queue, job.queue_job_id.as_str()))
            .arg(job.queue_job_id.as_str());
        let was_active: i64 = invocation.invoke_async(&mut conn).await?;
        if was_active == 0 {
            // Visibility expired and the job was reclaimed; the other
            // delivery owns the lifecycle now. At-least-once, not exactly-once.
            tracing::debug!(queue = %job.queue, queue_job_id = %job.queue_job_id, "ack after reclaim, dropped");
            return Ok(());
        }
        let mut event = lifecycle::event_for(job, QueueEventKind::Completed);
        event.return_value = return_value;
        self.publish(&event).await;
        Ok(())
    }

    async fn nack(
        &self,
        job: &LeasedJob,
        retriable: bool,
        reason: &str,
    ) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let retry = retriable && job.attempt < job.max_attempts;
        let deliver_at =
            SystemClock.epoch_ms() + job.backoff.delay_for(job.attempt).as_millis() as u64;
        let mut invocation = self.nack.prepare_invoke();
        invocation
            .key(keys::active(&job.queue))
            .key(keys::delayed(&job.queue))
            .key(keys::job(&job.queue, job.queue_job_id.as_str()))
            .arg(job.queue_job_id.as_str())
            .arg(if retry { "1" } else { "0" })
            .arg(deliver_at);
        let _requeued: i64 = invocation.invoke_async(&mut conn).await?;

        let mut event = if retry {
            lifecycle::event_for(job, QueueEventKind::Waiting)
        } else {
            lifecycle::event_for(job, QueueEventKind::Failed)
        };
        event.failed_reason = Some(reason.to_string());
        event.retries_exhausted = !retry && retriable;
        self.publish(&event).await;
        tracing::debug!(
            queue = %job.queue,
            queue_job_id = %job.queue_job_id,
            attempt = job.attempt,
            retry,
            reason,
            "nacked"
        );
        Ok(())
    }

    async fn subscribe_events(&self) -> Result<EventStream, QueueError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(keys::EVENTS_CHANNEL).await?;
        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let payload: String = msg.get_payload().ok()?;
            match serde_json::from_str::<sc_core::RawQueueEvent>(&payload) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!(error = %e, "unparseable lifecycle event dropped");
                    None
                }
            }
        });
        Ok(Box::pin(stream))
    }

    async fn waiting_depth(&self, queue: &str) -> Result<u64, QueueError> {
        let mut conn = self.conn.clone();
        let depth: u64 = conn.llen(keys::waiting(queue)).await?;
        Ok(depth)
    }

    async fn set_gate(&self, queue: &str, max_in_flight: Option<u32>) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        match max_in_flight {
            Some(max) => {
                let _: () = conn.set(keys::gate(queue), max).await?;
            }
            None => {
                let _: () = conn.del(keys::gate(queue)).await?;
            }
        }
        Ok(())
    }

    async fn reclaim_stalled(&self, queue: &str) -> Result<u64, QueueError> {
        let mut conn = self.conn.clone();
        let mut invocation = self.reclaim.prepare_invoke();
        invocation
            .key(keys::active(queue))
            .key(keys::waiting(queue))
            .arg(SystemClock.epoch_ms())
            .arg(keys::job(queue, ""));
        let marked: Vec<String> = invocation.invoke_async(&mut conn).await?;
        let mut reclaimed = 0u64;
        for marker in marked {
            let Some((disposition, raw_id)) = marker.split_once(':') else { continue };
            let id = QueueJobId::from_string(raw_id);
            let job = self.load_job_fields(queue, &id).await;
            match disposition {
                "stalled" => {
                    reclaimed += 1;
                    let (run_id, trigger) = job;
                    let event =
                        lifecycle::build(QueueEventKind::Stalled, queue, id.clone(), run_id, trigger);
                    self.publish(&event).await;
                    tracing::warn!(queue, queue_job_id = %id, "stalled job reclaimed");
                }
                "dead" => {
                    let (run_id, trigger) = job;
                    let mut event =
                        lifecycle::build(QueueEventKind::Failed, queue, id.clone(), run_id, trigger);
                    event.failed_reason = Some("visibility expired, attempts exhausted".to_string());
                    event.retries_exhausted = true;
                    self.publish(&event).await;
                    let _: () = conn.del(keys::job(queue, id.as_str())).await?;
                    tracing::warn!(queue, queue_job_id = %id, "stalled job dead-lettered");
                }
                _ => {}
            }
        }
        Ok(reclaimed)
    }
}

impl RedisSubstrate {
    /// Correlation fields only; missing records yield `(None, None)`.
    async fn load_job_fields(
        &self,
        queue: &str,
        id: &QueueJobId,
    ) -> (Option<RunId>, Option<Trigger>) {
        let mut conn = self.conn.clone();
        let job_key = keys::job(queue, id.as_str());
        let fields: Result<std::collections::HashMap<String, String>, _> =
            conn.hgetall(&job_key).await;
        match fields {
            Ok(map) => {
                let run_id =
                    map.get("run_id").filter(|v| !v.is_empty()).and_then(|v| RunId::parse(v).ok());
                let trigger =
                    map.get("trigger").filter(|v| !v.is_empty()).and_then(|v| Trigger::parse(v));
                (run_id, trigger)
            }
            Err(_) => (None, None),
        }
    }
}
