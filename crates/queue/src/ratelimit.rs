// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sliding-window rate limiter over `supercheck:session:ratelimit:*` keys.

use crate::error::QueueError;
use crate::{keys, scripts};
use async_trait::async_trait;
#[cfg(any(test, feature = "test-support"))]
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use redis::Script;
use sc_core::{Clock, SystemClock};
#[cfg(any(test, feature = "test-support"))]
use std::collections::{HashMap, VecDeque};
#[cfg(any(test, feature = "test-support"))]
use std::sync::Arc;
use std::time::Duration;

/// Boundary-facing limiter seam.
#[async_trait]
pub trait RateLimiter: Send + Sync + 'static {
    /// Record one request for `scope` and report whether it is admitted:
    /// `limit` requests per `window`, sliding.
    async fn check(
        &self,
        scope: &str,
        limit: u32,
        window: Duration,
    ) -> Result<bool, QueueError>;
}

/// Production limiter; the window lives in Redis so every app node shares
/// it. Fail-open on Redis errors is the caller's choice; this surfaces
/// them.
#[derive(Clone)]
pub struct RedisRateLimiter {
    conn: ConnectionManager,
    script: Script,
}

impl RedisRateLimiter {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn, script: Script::new(scripts::RATELIMIT) }
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(
        &self,
        scope: &str,
        limit: u32,
        window: Duration,
    ) -> Result<bool, QueueError> {
        let mut conn = self.conn.clone();
        let now = SystemClock.epoch_ms();
        let member = format!("{now}-{}", nanoid::nanoid!(8));
        let mut invocation = self.script.prepare_invoke();
        invocation
            .key(keys::ratelimit(scope))
            .arg(now)
            .arg(window.as_millis() as u64)
            .arg(limit)
            .arg(member);
        let admitted: i64 = invocation.invoke_async(&mut conn).await?;
        Ok(admitted == 1)
    }
}

/// Test limiter with the same sliding-window semantics over a local map.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone)]
pub struct MemoryRateLimiter<C: Clock = SystemClock> {
    windows: Arc<Mutex<HashMap<String, VecDeque<u64>>>>,
    clock: C,
}

#[cfg(any(test, feature = "test-support"))]
impl MemoryRateLimiter<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for MemoryRateLimiter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl<C: Clock> MemoryRateLimiter<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { windows: Arc::new(Mutex::new(HashMap::new())), clock }
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl<C: Clock + 'static> RateLimiter for MemoryRateLimiter<C> {
    async fn check(
        &self,
        scope: &str,
        limit: u32,
        window: Duration,
    ) -> Result<bool, QueueError> {
        let now = self.clock.epoch_ms();
        let horizon = now.saturating_sub(window.as_millis() as u64);
        let mut windows = self.windows.lock();
        let entries = windows.entry(keys::ratelimit(scope)).or_default();
        while entries.front().map(|at| *at <= horizon).unwrap_or(false) {
            entries.pop_front();
        }
        if entries.len() as u32 >= limit {
            return Ok(false);
        }
        entries.push_back(now);
        Ok(true)
    }
}

#[cfg(test)]
#[path = "ratelimit_tests.rs"]
mod tests;
