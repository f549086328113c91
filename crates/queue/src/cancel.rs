// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation plane.
//!
//! A short-TTL keyed flag per run. The API sets it; workers poll it at
//! least every second during execution and immediately after lease.

use crate::error::QueueError;
use crate::keys;
use async_trait::async_trait;
#[cfg(any(test, feature = "test-support"))]
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use sc_core::RunId;
#[cfg(any(test, feature = "test-support"))]
use std::collections::HashSet;
#[cfg(any(test, feature = "test-support"))]
use std::sync::Arc;

/// Flag TTL. Long enough to outlive any run, short enough to self-clean.
pub const CANCEL_TTL_SECS: u64 = 3_600;

#[async_trait]
pub trait CancelPlane: Send + Sync + 'static {
    /// Set the flag. No-op if already set.
    async fn signal(&self, run: RunId) -> Result<(), QueueError>;
    async fn is_cancelled(&self, run: RunId) -> Result<bool, QueueError>;
    /// Delete the flag (run finished before cancellation was observed).
    async fn clear(&self, run: RunId) -> Result<(), QueueError>;
}

#[derive(Clone)]
pub struct RedisCancelPlane {
    conn: ConnectionManager,
}

impl RedisCancelPlane {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(url)?;
        Ok(Self { conn: ConnectionManager::new(client).await? })
    }
}

#[async_trait]
impl CancelPlane for RedisCancelPlane {
    async fn signal(&self, run: RunId) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        // SET NX keeps the original TTL when the flag is already present.
        let _: Option<String> = redis::cmd("SET")
            .arg(keys::cancel(&run.to_string()))
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(CANCEL_TTL_SECS)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn is_cancelled(&self, run: RunId) -> Result<bool, QueueError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(keys::cancel(&run.to_string())).await?;
        Ok(exists)
    }

    async fn clear(&self, run: RunId) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(keys::cancel(&run.to_string())).await?;
        Ok(())
    }
}

/// In-memory flag set for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct MemoryCancelPlane {
    flags: Arc<Mutex<HashSet<RunId>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl MemoryCancelPlane {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl CancelPlane for MemoryCancelPlane {
    async fn signal(&self, run: RunId) -> Result<(), QueueError> {
        self.flags.lock().insert(run);
        Ok(())
    }

    async fn is_cancelled(&self, run: RunId) -> Result<bool, QueueError> {
        Ok(self.flags.lock().contains(&run))
    }

    async fn clear(&self, run: RunId) -> Result<(), QueueError> {
        self.flags.lock().remove(&run);
        Ok(())
    }
}

#[cfg(test)]
#[path = "cancel_tests.rs"]
mod tests;
