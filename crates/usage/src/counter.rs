// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Window counter backends.

use crate::UsageError;
use async_trait::async_trait;
#[cfg(any(test, feature = "test-support"))]
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use redis::Script;
#[cfg(any(test, feature = "test-support"))]
use std::collections::HashMap;
#[cfg(any(test, feature = "test-support"))]
use std::sync::Arc;

/// Increment-then-check with rollback, in one atomic step.
///
/// KEYS: counter
/// ARGV: units, limit, ttl_secs
///
/// Returns `{allowed (0/1), used_after}`.
const CONSUME: &str = r#"
local used = redis.call('INCRBY', KEYS[1], ARGV[1])
if used > tonumber(ARGV[2]) then
  redis.call('DECRBY', KEYS[1], ARGV[1])
  return {0, used - ARGV[1]}
end
redis.call('EXPIRE', KEYS[1], ARGV[3])
return {1, used}
"#;

/// Atomic window counter.
#[async_trait]
pub trait UsageCounter: Send + Sync + 'static {
    /// Try to add `units` without exceeding `limit`. Returns
    /// `(allowed, used_after)`; a denied call leaves the counter unchanged.
    async fn consume(
        &self,
        key: &str,
        units: i64,
        limit: i64,
        ttl_secs: u64,
    ) -> Result<(bool, i64), UsageError>;

    /// Undo a previous consumption (downstream failure rollback).
    async fn refund(&self, key: &str, units: i64) -> Result<(), UsageError>;
}

/// Redis-backed counter; race-free across replicas.
#[derive(Clone)]
pub struct RedisCounter {
    conn: ConnectionManager,
    script: Script,
}

impl RedisCounter {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn, script: Script::new(CONSUME) }
    }
}

#[async_trait]
impl UsageCounter for RedisCounter {
    async fn consume(
        &self,
        key: &str,
        units: i64,
        limit: i64,
        ttl_secs: u64,
    ) -> Result<(bool, i64), UsageError> {
        let mut conn = self.conn.clone();
        let mut invocation = self.script.prepare_invoke();
        invocation.key(key).arg(units).arg(limit).arg(ttl_secs);
        let (allowed, used): (i64, i64) = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(|e| UsageError::Counter(e.to_string()))?;
        Ok((allowed == 1, used))
    }

    async fn refund(&self, key: &str, units: i64) -> Result<(), UsageError> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("DECRBY")
            .arg(key)
            .arg(units)
            .query_async(&mut conn)
            .await
            .map_err(|e| UsageError::Counter(e.to_string()))?;
        Ok(())
    }
}

/// In-memory counter with the same contract, for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct MemoryCounter {
    counters: Arc<Mutex<HashMap<String, i64>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl MemoryCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, key: &str) -> i64 {
        self.counters.lock().get(key).copied().unwrap_or(0)
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl UsageCounter for MemoryCounter {
    async fn consume(
        &self,
        key: &str,
        units: i64,
        limit: i64,
        _ttl_secs: u64,
    ) -> Result<(bool, i64), UsageError> {
        let mut counters = self.counters.lock();
        let entry = counters.entry(key.to_string()).or_insert(0);
        let used = *entry + units;
        if used > limit {
            return Ok((false, *entry));
        }
        *entry = used;
        Ok((true, used))
    }

    async fn refund(&self, key: &str, units: i64) -> Result<(), UsageError> {
        let mut counters = self.counters.lock();
        if let Some(entry) = counters.get_mut(key) {
            *entry -= units;
        }
        Ok(())
    }
}
