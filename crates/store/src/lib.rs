// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sc-store: Typed access to the relational entities — runs, tests, jobs,
//! projects, organizations, plan limits, usage events, reports.
//!
//! All `runs` mutations are conditional updates; there are no long-held
//! transactions. [`PgStore`] is production, [`MemoryStore`] backs tests.

pub mod entities;
pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod pg;
pub mod secrets;

use async_trait::async_trait;
use sc_core::{
    Organization, PlanLimits, Project, Report, Run, RunId, RunPatch, RunStatus, ScheduledJob,
    TestDefinition,
};
use uuid::Uuid;

pub use entities::{
    NewRun, NewUsageEvent, ResolvedVariables, TokenIdentity, UsageEvent, UsageKind,
};
pub use error::StoreError;
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryStore;
pub use pg::PgStore;
pub use secrets::SecretCipher;

/// The state store surface.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Persist a new run with `status = queued`, `started_at = now`.
    async fn create_run(&self, new: NewRun) -> Result<Run, StoreError>;

    async fn run(&self, id: RunId) -> Result<Option<Run>, StoreError>;

    /// Conditional transition. Fails with [`StoreError::StateConflict`]
    /// when the row's current status is not `from`. Transitions into a
    /// terminal status set `completed_at`.
    async fn transition_run(
        &self,
        id: RunId,
        from: RunStatus,
        to: RunStatus,
        patch: RunPatch,
    ) -> Result<Run, StoreError>;

    /// Unconditional write to `cancelled` that never overwrites a terminal
    /// status. Returns the updated run, or `None` when the run was already
    /// terminal (the terminal status wins).
    async fn cancel_run(&self, id: RunId) -> Result<Option<Run>, StoreError>;

    /// Number of the project's runs in any of `statuses`.
    async fn count_runs(
        &self,
        project_id: Uuid,
        statuses: &[RunStatus],
    ) -> Result<i64, StoreError>;

    /// FIFO position: earlier-created runs of the same project still queued.
    async fn queued_position(&self, project_id: Uuid, run: RunId) -> Result<i64, StoreError>;

    async fn organization(&self, id: Uuid) -> Result<Option<Organization>, StoreError>;

    /// All tenants (the retention scheduler sweeps per tenant).
    async fn organizations(&self) -> Result<Vec<Organization>, StoreError>;

    async fn project(&self, id: Uuid) -> Result<Option<Project>, StoreError>;

    /// Plan limits for a tenant; tenants without a plan get the free tier.
    async fn plan_limits(&self, tenant_id: Uuid) -> Result<PlanLimits, StoreError>;

    /// Plaintext variables plus decrypted secrets. Ephemeral — must only
    /// travel inside the worker payload.
    async fn resolve_project_variables(
        &self,
        project_id: Uuid,
    ) -> Result<ResolvedVariables, StoreError>;

    async fn test_definition(&self, id: Uuid) -> Result<Option<TestDefinition>, StoreError>;

    /// All cron-scheduled job bundles (drained by the scheduler tick).
    async fn scheduled_jobs(&self) -> Result<Vec<ScheduledJob>, StoreError>;

    async fn upsert_report(&self, report: Report) -> Result<(), StoreError>;
    async fn report_for_run(&self, run: RunId) -> Result<Option<Report>, StoreError>;

    /// Append a usage event. Returns `false` when the dedupe key
    /// `(tenant_id, run_id, kind)` already exists.
    async fn insert_usage_event(&self, event: NewUsageEvent) -> Result<bool, StoreError>;
    async fn unsynced_usage_events(&self, limit: i64) -> Result<Vec<UsageEvent>, StoreError>;
    async fn mark_usage_synced(&self, ids: &[Uuid]) -> Result<(), StoreError>;

    async fn identity_for_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<TokenIdentity>, StoreError>;

    /// Terminal runs older than the retention horizon.
    async fn expired_run_ids(
        &self,
        tenant_id: Uuid,
        retention_days: i64,
    ) -> Result<Vec<RunId>, StoreError>;

    /// Cascade-delete run rows (artifacts are the sink's business).
    async fn delete_runs(&self, ids: &[RunId]) -> Result<u64, StoreError>;
}

/// Convenience: active (queued or running) statuses.
pub const ACTIVE_STATUSES: [RunStatus; 2] = [RunStatus::Queued, RunStatus::Running];

/// Helper used by admission and the gateway to enforce tenancy.
pub fn project_belongs_to(project: &Project, tenant_id: Uuid) -> bool {
    project.tenant_id == tenant_id
}
