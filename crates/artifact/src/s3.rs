// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S3-backed sink.

use crate::key::{ArtifactKey, EntityKind};
use crate::{ArtifactError, ArtifactSink, SinkLimits};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Bucket names per entity type.
#[derive(Debug, Clone)]
pub struct BucketConfig {
    pub runs: String,
    pub reports: String,
}

impl BucketConfig {
    fn bucket_for(&self, entity: EntityKind) -> &str {
        match entity {
            EntityKind::Run => &self.runs,
            EntityKind::Report => &self.reports,
        }
    }
}

/// Production sink.
#[derive(Clone)]
pub struct S3Sink {
    client: Client,
    buckets: BucketConfig,
    limits: SinkLimits,
    /// Per-run byte totals for ceiling enforcement.
    run_totals: Arc<Mutex<HashMap<Uuid, u64>>>,
}

impl S3Sink {
    pub async fn from_env(buckets: BucketConfig, limits: SinkLimits) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::new(Client::new(&config), buckets, limits)
    }

    pub fn new(client: Client, buckets: BucketConfig, limits: SinkLimits) -> Self {
        Self { client, buckets, limits, run_totals: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Reserve `size` bytes against the run total, or fail.
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

    /// Drop accounting for a finished run.
    pub fn forget_run(&self, run_id: Uuid) {
        self.run_totals.lock().remove(&run_id);
    }
}

#[async_trait]
impl ArtifactSink for S3Sink {
    async fn put(&self, key: &ArtifactKey, bytes: Bytes) -> Result<String, ArtifactError> {
        self.charge(key, bytes.len() as u64)?;
        let bucket = self.buckets.bucket_for(key.entity);
        let object_key = key.object_key();
        self.client
            .put_object()
            .bucket(bucket)
            .key(&object_key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| ArtifactError::Store(e.to_string()))?;
        tracing::debug!(bucket, key = %object_key, "artifact stored");
        Ok(format!("s3://{bucket}/{object_key}"))
    }

    async fn put_file(&self, key: &ArtifactKey, path: &Path) -> Result<String, ArtifactError> {
        let size = tokio::fs::metadata(path).await?.len();
        self.charge(key, size)?;
        let bucket = self.buckets.bucket_for(key.entity);
        let object_key = key.object_key();
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| ArtifactError::Store(e.to_string()))?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(&object_key)
            .body(body)
            .send()
            .await
            .map_err(|e| ArtifactError::Store(e.to_string()))?;
        tracing::debug!(bucket, key = %object_key, size, "artifact streamed");
        Ok(format!("s3://{bucket}/{object_key}"))
    }

    async fn signed_read(
        &self,
        key: &ArtifactKey,
        ttl: Duration,
    ) -> Result<String, ArtifactError> {
        let bucket = self.buckets.bucket_for(key.entity);
        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|e| ArtifactError::Store(e.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key.object_key())
            .presigned(presigning)
            .await
            .map_err(|e| ArtifactError::Store(e.to_string()))?;
        Ok(request.uri().to_string())
    }
}
