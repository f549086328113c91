// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sc-usage: Execution-minute and credit accounting per tenant per billing
//! window.
//!
//! Credit consumption is an atomic increment-then-check against a window
//! counter; denial rolls the increment back. Minute records are idempotent
//! by `(tenant, run, kind)`.

pub mod counter;
pub mod ledger;
pub mod window;

use async_trait::async_trait;
use sc_core::RunId;
use sc_store::{StoreError, UsageKind};
use thiserror::Error;
use uuid::Uuid;

#[cfg(any(test, feature = "test-support"))]
pub use counter::MemoryCounter;
pub use counter::{RedisCounter, UsageCounter};
pub use ledger::{Ledger, NoopSync, UsageSyncHook};
pub use window::current_window;

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("counter backend error: {0}")]
    Counter(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("sync hook error: {0}")]
    Sync(String),
}

/// Outcome of a credit consumption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditDecision {
    pub allowed: bool,
    /// Units consumed in the window after this call.
    pub used: i64,
    pub limit: i64,
}

/// The usage ledger surface.
#[async_trait]
pub trait CreditLedger: Send + Sync + 'static {
    /// Atomically consume `units` of `kind` for the current billing window.
    ///
    /// Two concurrent calls that would together exceed the limit result in
    /// exactly one denial.
    async fn consume_credit(
        &self,
        tenant_id: Uuid,
        kind: UsageKind,
        units: i64,
        run_id: Option<RunId>,
    ) -> Result<CreditDecision, UsageError>;

    /// Undo an earlier consumption after a downstream failure (e.g. the
    /// enqueue that the credits paid for never happened).
    async fn refund_credit(
        &self,
        tenant_id: Uuid,
        kind: UsageKind,
        units: i64,
    ) -> Result<(), UsageError>;

    /// Record execution minutes for a finished run. Idempotent.
    async fn record_minutes(
        &self,
        tenant_id: Uuid,
        run_id: RunId,
        minutes: i64,
    ) -> Result<(), UsageError>;

    /// Push unsynced usage rows to the external billing collaborator.
    /// At-least-once; rows keep `synced_at = NULL` until the push succeeds.
    async fn sync_pending(&self, batch: i64) -> Result<u64, UsageError>;
}
