// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sc-artifact: Object-store sink for run artifacts and reports.
//!
//! Deterministic key scheme `<entity-type>/<tenant>/<project>/<entity>/<file>`,
//! per-entity-type buckets, size ceilings per file and per run. The sink
//! never transforms content and never rewrites a key.

pub mod key;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub use key::{ArtifactKey, EntityKind};
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemorySink;
pub use s3::{BucketConfig, S3Sink};

/// Upload ceilings. Totals are tracked per run within one process, which
/// matches the worker model (one process uploads a run's artifacts).
#[derive(Debug, Clone, Copy)]
pub struct SinkLimits {
    pub max_file_bytes: u64,
    pub max_run_total_bytes: u64,
}

impl Default for SinkLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 25 * 1024 * 1024,
            max_run_total_bytes: 100 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact {key} exceeds the per-file ceiling ({size} > {limit} bytes)")]
    FileTooLarge { key: String, size: u64, limit: u64 },
    #[error("run {run} exceeds the per-run artifact ceiling ({limit} bytes)")]
    RunTotalExceeded { run: String, limit: u64 },
    #[error("object store error: {0}")]
    Store(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The artifact sink surface.
#[async_trait]
pub trait ArtifactSink: Send + Sync + 'static {
    /// Store bytes under a key; returns the stored object's URL reference.
    async fn put(&self, key: &ArtifactKey, bytes: Bytes) -> Result<String, ArtifactError>;

    /// Stream a file from disk (the common worker path).
    async fn put_file(&self, key: &ArtifactKey, path: &Path) -> Result<String, ArtifactError>;

    /// Presigned read URL with a TTL.
    async fn signed_read(&self, key: &ArtifactKey, ttl: Duration)
        -> Result<String, ArtifactError>;
}
