// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sc-queue: Redis-backed work queues with delayed jobs, atomic leasing,
//! per-queue concurrency gates, retry with backoff, stalled-job reclaim,
//! and a lifecycle-event side channel.
//!
//! The [`Substrate`] trait is the seam: production uses [`RedisSubstrate`],
//! tests use [`MemorySubstrate`].

pub mod cancel;
pub mod error;
pub mod job;
pub mod keys;
pub mod lifecycle;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod ratelimit;
pub mod redis_impl;
mod scripts;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use sc_core::{QueueJobId, RawQueueEvent, WorkerId};
use std::time::Duration;

#[cfg(any(test, feature = "test-support"))]
pub use cancel::MemoryCancelPlane;
pub use cancel::{CancelPlane, RedisCancelPlane};
pub use error::QueueError;
pub use job::{Backoff, EnqueueOpts, LeasedJob};
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemorySubstrate;
#[cfg(any(test, feature = "test-support"))]
pub use ratelimit::MemoryRateLimiter;
pub use ratelimit::{RateLimiter, RedisRateLimiter};
pub use redis_impl::RedisSubstrate;

/// Stream of lifecycle events from the substrate's side channel.
pub type EventStream = BoxStream<'static, RawQueueEvent>;

/// The queue substrate surface.
///
/// Implementations must make `lease` atomic with respect to the per-queue
/// concurrency gate: two workers may never hold more than `max_in_flight`
/// jobs of one queue between them.
#[async_trait]
pub trait Substrate: Send + Sync + 'static {
    /// Add a job. Returns the substrate-assigned job id.
    async fn enqueue(
        &self,
        queue: &str,
        payload: &serde_json::Value,
        opts: EnqueueOpts,
    ) -> Result<QueueJobId, QueueError>;

    /// Atomically pop one job from the first non-empty, non-gated queue.
    ///
    /// `visibility` is the deadline for [`Substrate::ack`]; past it the job
    /// is considered stalled and is reclaimed.
    async fn lease(
        &self,
        queues: &[String],
        worker: &WorkerId,
        visibility: Duration,
    ) -> Result<Option<LeasedJob>, QueueError>;

    /// Complete a job. `return_value` rides on the `completed` lifecycle
    /// event so subscribers can derive pass/fail without a DB read.
    async fn ack(
        &self,
        job: &LeasedJob,
        return_value: Option<serde_json::Value>,
    ) -> Result<(), QueueError>;

    /// Fail a job. Retriable failures below the attempt cap are re-queued
    /// with exponential backoff; everything else emits a terminal `failed`
    /// event and drops the job.
    async fn nack(&self, job: &LeasedJob, retriable: bool, reason: &str)
        -> Result<(), QueueError>;

    /// Subscribe to the lifecycle side channel. The subscriber does not
    /// need to own any of the jobs it observes.
    async fn subscribe_events(&self) -> Result<EventStream, QueueError>;

    /// Number of jobs waiting (not delayed, not active) in a queue.
    async fn waiting_depth(&self, queue: &str) -> Result<u64, QueueError>;

    /// Set the concurrency gate for a queue. `None` removes the gate.
    async fn set_gate(&self, queue: &str, max_in_flight: Option<u32>) -> Result<(), QueueError>;

    /// Move jobs whose visibility deadline has passed back to waiting.
    /// Returns how many were reclaimed.
    async fn reclaim_stalled(&self, queue: &str) -> Result<u64, QueueError>;
}
