// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ledger proper — counters for gating, store rows for the record.

use crate::counter::UsageCounter;
use crate::window::{current_window, WINDOW_TTL_SECS};
use crate::{CreditDecision, CreditLedger, UsageError};
use async_trait::async_trait;
use sc_core::RunId;
use sc_queue::keys;
use sc_store::{NewUsageEvent, Store, UsageEvent, UsageKind};
use std::sync::Arc;
use uuid::Uuid;

/// External billing collaborator seam. Non-blocking with respect to run
/// completion; failures leave rows unsynced for the next sweep.
#[async_trait]
pub trait UsageSyncHook: Send + Sync + 'static {
    async fn push(&self, events: &[UsageEvent]) -> Result<(), UsageError>;
}

/// Default hook for self-hosted mode: accepts everything.
#[derive(Clone, Default)]
pub struct NoopSync;

#[async_trait]
impl UsageSyncHook for NoopSync {
    async fn push(&self, _events: &[UsageEvent]) -> Result<(), UsageError> {
        Ok(())
    }
}

/// Production ledger, generic over the counter backend.
pub struct Ledger<C, S> {
    counter: C,
    store: Arc<S>,
    sync: Arc<dyn UsageSyncHook>,
}

impl<C: UsageCounter, S: Store> Ledger<C, S> {
    pub fn new(counter: C, store: Arc<S>) -> Self {
        Self { counter, store, sync: Arc::new(NoopSync) }
    }

    pub fn with_sync_hook(mut self, sync: Arc<dyn UsageSyncHook>) -> Self {
        self.sync = sync;
        self
    }

    fn limit_for(&self, limits: &sc_core::PlanLimits, kind: UsageKind) -> i64 {
        match kind {
            UsageKind::ExecutionMinutes => limits.included_minutes,
            UsageKind::AiCredits => limits.included_credits,
        }
    }
}

#[async_trait]
impl<C: UsageCounter, S: Store> CreditLedger for Ledger<C, S> {
    async fn consume_credit(
        &self,
        tenant_id: Uuid,
        kind: UsageKind,
        units: i64,
        run_id: Option<RunId>,
    ) -> Result<CreditDecision, UsageError> {
        let window = current_window();
        let limits = self.store.plan_limits(tenant_id).await?;
        let limit = self.limit_for(&limits, kind);
        let key = keys::usage(&tenant_id.to_string(), &format!("{window}:{kind}"));

        let (allowed, used) =
            self.counter.consume(&key, units, limit, WINDOW_TTL_SECS).await?;
        if !allowed {
            tracing::warn!(tenant = %tenant_id, %kind, units, used, limit, "credit denied");
            return Ok(CreditDecision { allowed: false, used, limit });
        }

        let inserted = self
            .store
            .insert_usage_event(NewUsageEvent {
                tenant_id,
                window_id: window,
                kind,
                units,
                run_id: run_id.map(|r| r.as_uuid()),
            })
            .await;
        match inserted {
            Ok(true) => Ok(CreditDecision { allowed: true, used, limit }),
            Ok(false) => {
                // Dedupe hit: this run already paid. Refund the counter so
                // the window total stays accurate.
                self.counter.refund(&key, units).await?;
                Ok(CreditDecision { allowed: true, used: used - units, limit })
            }
            Err(e) => {
                // Downstream failure: roll the increment back before
                // surfacing the error.
                self.counter.refund(&key, units).await?;
                Err(e.into())
            }
        }
    }

    async fn refund_credit(
        &self,
        tenant_id: Uuid,
        kind: UsageKind,
        units: i64,
    ) -> Result<(), UsageError> {
        let key = keys::usage(
            &tenant_id.to_string(),
            &format!("{}:{kind}", current_window()),
        );
        self.counter.refund(&key, units).await
    }

    async fn record_minutes(
        &self,
        tenant_id: Uuid,
        run_id: RunId,
        minutes: i64,
    ) -> Result<(), UsageError> {
        // Recorded after the fact; the row is the record, not a gate.
        // The dedupe key makes stalled-redelivery double-reports no-ops.
        let _ = self
            .store
            .insert_usage_event(NewUsageEvent {
                tenant_id,
                window_id: current_window(),
                kind: UsageKind::ExecutionMinutes,
                units: minutes.max(1),
                run_id: Some(run_id.as_uuid()),
            })
            .await?;
        Ok(())
    }

    async fn sync_pending(&self, batch: i64) -> Result<u64, UsageError> {
        let pending = self.store.unsynced_usage_events(batch).await?;
        if pending.is_empty() {
            return Ok(0);
        }
        self.sync.push(&pending).await?;
        let ids: Vec<Uuid> = pending.iter().map(|e| e.id).collect();
        self.store.mark_usage_synced(&ids).await?;
        Ok(ids.len() as u64)
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
