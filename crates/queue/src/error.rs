// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue substrate errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("payload serialization: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("queue job not found: {0}")]
    JobNotFound(String),
    #[error("lifecycle channel closed")]
    ChannelClosed,
}

impl QueueError {
    /// Substrate blips worth retrying at the call site.
    pub fn is_transient(&self) -> bool {
        match self {
            QueueError::Redis(e) => {
                e.is_io_error() || e.is_timeout() || e.is_connection_dropped()
            }
            QueueError::ChannelClosed => true,
            _ => false,
        }
    }
}
