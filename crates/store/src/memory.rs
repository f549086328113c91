// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store for tests.
//!
//! Implements the same conditional-update semantics as [`crate::PgStore`]
//! over hash maps. Seeding helpers let suites build a tenant in a few lines.

use crate::entities::{NewRun, NewUsageEvent, ResolvedVariables, TokenIdentity, UsageEvent};
use crate::error::StoreError;
use crate::Store;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use sc_core::{
    Organization, PlanLimits, Project, Report, ReportEntity, Run, RunId, RunPatch, RunStatus,
    ScheduledJob, SubscriptionStatus, TestDefinition,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    runs: HashMap<RunId, Run>,
    organizations: HashMap<Uuid, Organization>,
    projects: HashMap<Uuid, Project>,
    plan_limits: HashMap<Uuid, PlanLimits>,
    variables: HashMap<Uuid, ResolvedVariables>,
    tests: HashMap<Uuid, TestDefinition>,
    jobs: Vec<ScheduledJob>,
    reports: HashMap<(String, Uuid), Report>,
    usage_events: Vec<UsageEvent>,
    tokens: HashMap<String, TokenIdentity>,
}

/// Test double for the Postgres store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an active tenant with a project; returns `(tenant_id, project_id)`.
    pub fn seed_tenant(&self) -> (Uuid, Uuid) {
        self.seed_tenant_with_status(SubscriptionStatus::Active)
    }

    pub fn seed_tenant_with_status(&self, status: SubscriptionStatus) -> (Uuid, Uuid) {
        let tenant_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let mut inner = self.inner.lock();
        inner.organizations.insert(
            tenant_id,
            Organization { id: tenant_id, plan_id: None, subscription_status: status },
        );
        inner.projects.insert(
            project_id,
            Project { id: project_id, tenant_id, slug: format!("proj-{}", &project_id.to_string()[..8]) },
        );
        (tenant_id, project_id)
    }

    pub fn set_plan_limits(&self, tenant_id: Uuid, limits: PlanLimits) {
        self.inner.lock().plan_limits.insert(tenant_id, limits);
    }

    pub fn seed_variables(&self, project_id: Uuid, resolved: ResolvedVariables) {
        self.inner.lock().variables.insert(project_id, resolved);
    }

    pub fn seed_test(&self, test: TestDefinition) {
        self.inner.lock().tests.insert(test.id, test);
    }

    pub fn seed_job(&self, job: ScheduledJob) {
        self.inner.lock().jobs.push(job);
    }

    pub fn seed_token(&self, token_hash: &str, identity: TokenIdentity) {
        self.inner.lock().tokens.insert(token_hash.to_string(), identity);
    }

    /// Direct row access for assertions.
    pub fn run_snapshot(&self, id: RunId) -> Option<Run> {
        self.inner.lock().runs.get(&id).cloned()
    }

    /// Shift a run's timestamps into the past (retention tests).
    pub fn backdate_run(&self, id: RunId, days: i64) {
        let mut inner = self.inner.lock();
        if let Some(run) = inner.runs.get_mut(&id) {
            let shift = ChronoDuration::days(days);
            run.started_at -= shift;
            run.completed_at = run.completed_at.map(|at| at - shift);
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_run(&self, new: NewRun) -> Result<Run, StoreError> {
        let run = Run {
            id: RunId::generate(),
            tenant_id: new.tenant_id,
            project_id: new.project_id,
            job_id: new.job_id,
            status: RunStatus::Queued,
            trigger: new.trigger,
            location: new.location,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            error_details: None,
            artifact_paths: Vec::new(),
            metadata: new.metadata,
        };
        self.inner.lock().runs.insert(run.id, run.clone());
        Ok(run)
    }

    async fn run(&self, id: RunId) -> Result<Option<Run>, StoreError> {
        Ok(self.inner.lock().runs.get(&id).cloned())
    }

    async fn transition_run(
        &self,
        id: RunId,
        from: RunStatus,
        to: RunStatus,
        patch: RunPatch,
    ) -> Result<Run, StoreError> {
        let mut inner = self.inner.lock();
        let run = inner
            .runs
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("run {id}")))?;
        if run.status != from {
            return Err(StoreError::StateConflict { expected: from, current: run.status });
        }
        run.status = to;
        if to.is_terminal() {
            let now = Utc::now();
            run.completed_at = Some(now);
            run.duration_ms = patch
                .duration_ms
                .or_else(|| Some((now - run.started_at).num_milliseconds()));
        } else if let Some(ms) = patch.duration_ms {
            run.duration_ms = Some(ms);
        }
        if let Some(details) = patch.error_details {
            run.error_details = Some(details);
        }
        if let Some(paths) = patch.artifact_paths {
            run.artifact_paths = paths;
        }
        Ok(run.clone())
    }

    async fn cancel_run(&self, id: RunId) -> Result<Option<Run>, StoreError> {
        let mut inner = self.inner.lock();
        let run = inner
            .runs
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("run {id}")))?;
        if run.status.is_terminal() {
            return Ok(None);
        }
        run.status = RunStatus::Cancelled;
        let now = Utc::now();
        run.completed_at = Some(now);
        run.duration_ms = Some((now - run.started_at).num_milliseconds());
        Ok(Some(run.clone()))
    }

    async fn count_runs(
        &self,
        project_id: Uuid,
        statuses: &[RunStatus],
    ) -> Result<i64, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .runs
            .values()
            .filter(|r| r.project_id == project_id && statuses.contains(&r.status))
            .count() as i64)
    }

    async fn queued_position(&self, project_id: Uuid, run: RunId) -> Result<i64, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .runs
            .values()
            .filter(|r| {
                r.project_id == project_id && r.status == RunStatus::Queued && r.id < run
            })
            .count() as i64)
    }

    async fn organization(&self, id: Uuid) -> Result<Option<Organization>, StoreError> {
        Ok(self.inner.lock().organizations.get(&id).cloned())
    }

    async fn organizations(&self) -> Result<Vec<Organization>, StoreError> {
        Ok(self.inner.lock().organizations.values().cloned().collect())
    }

    async fn project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        Ok(self.inner.lock().projects.get(&id).cloned())
    }

    async fn plan_limits(&self, tenant_id: Uuid) -> Result<PlanLimits, StoreError> {
        Ok(self
            .inner
            .lock()
            .plan_limits
            .get(&tenant_id)
            .cloned()
            .unwrap_or_else(PlanLimits::free_tier))
    }

    async fn resolve_project_variables(
        &self,
        project_id: Uuid,
    ) -> Result<ResolvedVariables, StoreError> {
        Ok(self.inner.lock().variables.get(&project_id).cloned().unwrap_or_default())
    }

    async fn test_definition(&self, id: Uuid) -> Result<Option<TestDefinition>, StoreError> {
        Ok(self.inner.lock().tests.get(&id).cloned())
    }

    async fn scheduled_jobs(&self) -> Result<Vec<ScheduledJob>, StoreError> {
        Ok(self.inner.lock().jobs.iter().filter(|j| j.schedule.is_some()).cloned().collect())
    }

    async fn upsert_report(&self, report: Report) -> Result<(), StoreError> {
        self.inner
            .lock()
            .reports
            .insert((report.entity_type.to_string(), report.entity_id), report);
        Ok(())
    }

    async fn report_for_run(&self, run: RunId) -> Result<Option<Report>, StoreError> {
        Ok(self
            .inner
            .lock()
            .reports
            .get(&(ReportEntity::Run.to_string(), run.as_uuid()))
            .cloned())
    }

    async fn insert_usage_event(&self, event: NewUsageEvent) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        if let Some(run_id) = event.run_id {
            let duplicate = inner.usage_events.iter().any(|e| {
                e.tenant_id == event.tenant_id && e.run_id == Some(run_id) && e.kind == event.kind
            });
            if duplicate {
                return Ok(false);
            }
        }
        inner.usage_events.push(UsageEvent {
            id: Uuid::new_v4(),
            tenant_id: event.tenant_id,
            window_id: event.window_id,
            kind: event.kind,
            units: event.units,
            run_id: event.run_id,
            created_at: Utc::now(),
            synced_at: None,
        });
        Ok(true)
    }

    async fn unsynced_usage_events(&self, limit: i64) -> Result<Vec<UsageEvent>, StoreError> {
        Ok(self
            .inner
            .lock()
            .usage_events
            .iter()
            .filter(|e| e.synced_at.is_none())
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn mark_usage_synced(&self, ids: &[Uuid]) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut inner = self.inner.lock();
        for event in inner.usage_events.iter_mut() {
            if ids.contains(&event.id) {
                event.synced_at = Some(now);
            }
        }
        Ok(())
    }

    async fn identity_for_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<TokenIdentity>, StoreError> {
        Ok(self.inner.lock().tokens.get(token_hash).cloned())
    }

    async fn expired_run_ids(
        &self,
        tenant_id: Uuid,
        retention_days: i64,
    ) -> Result<Vec<RunId>, StoreError> {
        let horizon = Utc::now() - ChronoDuration::days(retention_days);
        Ok(self
            .inner
            .lock()
            .runs
            .values()
            .filter(|r| {
                r.tenant_id == tenant_id
                    && r.status.is_terminal()
                    && r.completed_at.map(|at| at < horizon).unwrap_or(false)
            })
            .map(|r| r.id)
            .collect())
    }

    async fn delete_runs(&self, ids: &[RunId]) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock();
        let before = inner.runs.len();
        inner.runs.retain(|id, _| !ids.contains(id));
        Ok((before - inner.runs.len()) as u64)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
