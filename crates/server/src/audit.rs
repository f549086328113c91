// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fire-and-forget security audit log.
//!
//! Events go through a bounded buffer to a pluggable sink; a full buffer
//! drops the event and bumps a counter. Recording never blocks a request.

use async_trait::async_trait;
use sc_core::Clock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

const BUFFER_CAPACITY: usize = 512;

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub action: &'static str,
    pub tenant_id: Option<Uuid>,
    pub detail: String,
    pub epoch_ms: u64,
}

/// Where audit events end up (external collaborator seam).
#[async_trait]
pub trait AuditSink: Send + Sync + 'static {
    async fn write(&self, event: AuditEvent);
}

/// Default sink: structured log lines.
#[derive(Clone, Default)]
pub struct TracingSink;

#[async_trait]
impl AuditSink for TracingSink {
    async fn write(&self, event: AuditEvent) {
        tracing::warn!(
            action = event.action,
            tenant = ?event.tenant_id,
            detail = %event.detail,
            "security event"
        );
    }
}

#[derive(Clone)]
pub struct AuditLog {
    tx: mpsc::Sender<AuditEvent>,
    dropped: Arc<AtomicU64>,
}

impl AuditLog {
    /// Start the drain task and hand back the handle.
    pub fn start(sink: Arc<dyn AuditSink>) -> Self {
        let (tx, mut rx) = mpsc::channel(BUFFER_CAPACITY);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                sink.write(event).await;
            }
        });
        Self { tx, dropped: Arc::new(AtomicU64::new(0)) }
    }

    /// Record an event; drops when the buffer is full.
    pub fn record(&self, action: &'static str, tenant_id: Option<Uuid>, detail: impl Into<String>) {
        let event = AuditEvent {
            action,
            tenant_id,
            detail: detail.into(),
            epoch_ms: sc_core::SystemClock.epoch_ms(),
        };
        if self.tx.try_send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
