// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory sink for tests.

use crate::key::ArtifactKey;
use crate::{ArtifactError, ArtifactSink, SinkLimits};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Test double that stores objects in a map.
#[derive(Clone)]
pub struct MemorySink {
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
    run_totals: Arc<Mutex<HashMap<Uuid, u64>>>,
    limits: SinkLimits,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::with_limits(SinkLimits::default())
    }

    pub fn with_limits(limits: SinkLimits) -> Self {
        Self {
            objects: Arc::new(Mutex::new(HashMap::new())),
            run_totals: Arc::new(Mutex::new(HashMap::new())),
            limits,
        }
    }

    pub fn object(&self, key: &ArtifactKey) -> Option<Bytes> {
        self.objects.lock().get(&key.object_key()).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().len()
    }

    fn charge(&self, key: &ArtifactKey, size: u64) -> Result<(), ArtifactError> {
        if size > self.limits.max_file_bytes {
            return Err(ArtifactError::FileTooLarge {
                key: key.object_key(),
                size,
                limit: self.limits.max_file_bytes,
            });
        }
        let mut totals = self.run_totals.lock();
        let total = totals.entry(key.entity_id).or_insert(0);
        if *total + size > self.limits.max_run_total_bytes {
            return Err(ArtifactError::RunTotalExceeded {
                run: key.entity_id.to_string(),
                limit: self.limits.max_run_total_bytes,
            });
        }
        *total += size;
        Ok(())
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactSink for MemorySink {
    async fn put(&self, key: &ArtifactKey, bytes: Bytes) -> Result<String, ArtifactError> {
        self.charge(key, bytes.len() as u64)?;
        let object_key = key.object_key();
        self.objects.lock().insert(object_key.clone(), bytes);
        Ok(format!("memory://{object_key}"))
    }

    async fn put_file(&self, key: &ArtifactKey, path: &Path) -> Result<String, ArtifactError> {
        let bytes = tokio::fs::read(path).await?;
        self.put(key, Bytes::from(bytes)).await
    }

    async fn signed_read(
        &self,
        key: &ArtifactKey,
        ttl: Duration,
    ) -> Result<String, ArtifactError> {
        let object_key = key.object_key();
        if !self.objects.lock().contains_key(&object_key) {
            return Err(ArtifactError::Store(format!("no such object: {object_key}")));
        }
        Ok(format!("memory://{object_key}?ttl={}", ttl.as_secs()))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
