// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-process event hub.
//!
//! One instance per app node. Subscribes to the substrate's lifecycle
//! channel, normalizes events, and fans out to in-process subscribers over
//! bounded queues. Dispatch is best-effort: a slow subscriber loses its
//! oldest events (and is told so), it never blocks the others.

use parking_lot::{Mutex, RwLock};
use sc_core::{
    derive_status, NormalizedQueueEvent, QueueName, RawQueueEvent, RunId,
};
use sc_queue::Substrate;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Per-subscriber buffer capacity.
pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 256;

/// Cap on the per-run ordering guard map.
const RUN_RANK_CAPACITY: usize = 4096;

/// What a subscriber receives.
#[derive(Debug, Clone)]
pub enum HubMessage {
    Event(NormalizedQueueEvent),
    /// `n` events were dropped since the last receive; clients reconcile
    /// with a snapshot fetch.
    Dropped(u64),
}

struct SubscriberQueue {
    buf: Mutex<VecDeque<NormalizedQueueEvent>>,
    dropped: AtomicU64,
    notify: Notify,
}

impl SubscriberQueue {
    fn push(&self, event: NormalizedQueueEvent) {
        {
            let mut buf = self.buf.lock();
            if buf.len() >= SUBSCRIBER_QUEUE_CAPACITY {
                buf.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            buf.push_back(event);
        }
        self.notify.notify_one();
    }
}

/// A live hub subscription. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    queue: Arc<SubscriberQueue>,
    hub: Arc<HubInner>,
}

impl Subscription {
    /// Wait for the next message.
    pub async fn recv(&mut self) -> HubMessage {
        loop {
            let dropped = self.queue.dropped.swap(0, Ordering::Relaxed);
            if dropped > 0 {
                return HubMessage::Dropped(dropped);
            }
            if let Some(event) = self.queue.buf.lock().pop_front() {
                return HubMessage::Event(event);
            }
            self.queue.notify.notified().await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.subscribers.write().retain(|(id, _)| *id != self.id);
    }
}

struct HubInner {
    subscribers: RwLock<Vec<(u64, Arc<SubscriberQueue>)>>,
    next_id: AtomicU64,
    /// Last observed status rank per run; regressions are dropped.
    run_ranks: Mutex<RankMap>,
}

/// Process-scoped event hub with explicit init/teardown.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
                run_ranks: Mutex::new(RankMap::new(RUN_RANK_CAPACITY)),
            }),
        }
    }

    /// Start pumping the substrate's lifecycle channel into this hub.
    /// Runs until `shutdown` fires; reconnects on stream loss.
    pub fn attach<Q: Substrate + ?Sized>(
        &self,
        substrate: Arc<Q>,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let hub = self.clone();
        tokio::spawn(async move {
            use futures_util::StreamExt;
            loop {
                let mut stream = match substrate.subscribe_events().await {
                    Ok(stream) => stream,
                    Err(e) => {
                        tracing::warn!(error = %e, "lifecycle subscribe failed, retrying");
                        tokio::select! {
                            _ = shutdown.cancelled() => return,
                            _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => continue,
                        }
                    }
                };
                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => return,
                        event = stream.next() => match event {
                            Some(raw) => hub.publish(raw),
                            None => break, // stream lost; resubscribe
                        },
                    }
                }
                tracing::warn!("lifecycle stream ended, resubscribing");
            }
        })
    }

    /// Normalize and fan out one raw event.
    pub fn publish(&self, raw: RawQueueEvent) {
        let Some(event) = self.normalize(raw) else { return };
        // Copy-on-read: snapshot the list, never dispatch under the lock.
        let subscribers: Vec<Arc<SubscriberQueue>> = {
            let guard = self.inner.subscribers.read();
            guard.iter().map(|(_, q)| Arc::clone(q)).collect()
        };
        for queue in subscribers {
            queue.push(event.clone());
        }
    }

    /// Raw → normalized, with the per-run status-regression guard.
    fn normalize(&self, raw: RawQueueEvent) -> Option<NormalizedQueueEvent> {
        let status = derive_status(&raw);
        if let Some(run_id) = raw.run_id {
            let mut ranks = self.inner.run_ranks.lock();
            let rank = status.rank();
            if let Some(last) = ranks.get(run_id) {
                if rank < last {
                    tracing::debug!(
                        run_id = %run_id,
                        status = %status,
                        "status regression dropped"
                    );
                    return None;
                }
            }
            ranks.insert(run_id, rank);
        }
        let category = QueueName::parse(&raw.queue)
            .map(|q| q.category())
            .unwrap_or(sc_core::EventCategory::Job);
        Some(NormalizedQueueEvent {
            queue: raw.queue,
            category,
            event: raw.kind,
            status,
            queue_job_id: raw.queue_job_id,
            run_id: raw.run_id,
            trigger: raw.trigger,
            epoch_ms: raw.epoch_ms,
            return_value: raw.return_value,
            failed_reason: raw.failed_reason,
        })
    }

    pub fn subscribe(&self) -> Subscription {
        let queue = Arc::new(SubscriberQueue {
            buf: Mutex::new(VecDeque::new()),
            dropped: AtomicU64::new(0),
            notify: Notify::new(),
        });
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.write().push((id, Arc::clone(&queue)));
        Subscription { id, queue, hub: Arc::clone(&self.inner) }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Insertion-order-bounded rank map (small, no external cache dep).
struct RankMap {
    map: HashMap<RunId, u8>,
    order: VecDeque<RunId>,
    capacity: usize,
}

impl RankMap {
    fn new(capacity: usize) -> Self {
        Self { map: HashMap::new(), order: VecDeque::new(), capacity }
    }

    fn get(&self, run: RunId) -> Option<u8> {
        self.map.get(&run).copied()
    }

    fn insert(&mut self, run: RunId, rank: u8) {
        if self.map.insert(run, rank).is_none() {
            self.order.push_back(run);
            if self.order.len() > self.capacity {
                if let Some(evicted) = self.order.pop_front() {
                    self.map.remove(&evicted);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
