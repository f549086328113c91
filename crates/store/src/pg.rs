// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Postgres store implementation.
//!
//! Queries are short conditional statements; the hot reads are covered by
//! indexes on `(project_id, status)` and `(job_id, status)`.

use crate::entities::{NewRun, NewUsageEvent, ResolvedVariables, TokenIdentity, UsageEvent, UsageKind};
use crate::error::StoreError;
use crate::secrets::SecretCipher;
use crate::Store;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sc_core::{
    Location, Organization, PlanLimits, Project, Report, ReportEntity, Run, RunId, RunMetadata,
    RunPatch, RunStatus, ScheduledJob, SubscriptionStatus, TestDefinition, TestType, Trigger,
};
use sc_core::test_def::JobType;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Production store. Cheap to clone.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    cipher: Option<SecretCipher>,
}

impl PgStore {
    pub async fn connect(database_url: &str, cipher: Option<SecretCipher>) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(16)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self { pool, cipher })
    }

    pub fn with_pool(pool: PgPool, cipher: Option<SecretCipher>) -> Self {
        Self { pool, cipher }
    }

    /// Apply embedded migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(FromRow)]
struct RunRow {
    id: Uuid,
    tenant_id: Uuid,
    project_id: Uuid,
    job_id: Option<Uuid>,
    status: String,
    trigger: String,
    location: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    duration_ms: Option<i64>,
    error_details: Option<String>,
    artifact_paths: Vec<String>,
    metadata: serde_json::Value,
}

impl TryFrom<RunRow> for Run {
    type Error = StoreError;

    fn try_from(row: RunRow) -> Result<Self, StoreError> {
        let status = RunStatus::parse(&row.status)
            .ok_or_else(|| StoreError::CorruptRow(format!("run status {:?}", row.status)))?;
        let trigger = Trigger::parse(&row.trigger)
            .ok_or_else(|| StoreError::CorruptRow(format!("run trigger {:?}", row.trigger)))?;
        let location = Location::parse(&row.location)
            .ok_or_else(|| StoreError::CorruptRow(format!("run location {:?}", row.location)))?;
        let metadata = RunMetadata::from_value(row.metadata).map_err(StoreError::CorruptRow)?;
        Ok(Run {
            id: RunId(row.id),
            tenant_id: row.tenant_id,
            project_id: row.project_id,
            job_id: row.job_id,
            status,
            trigger,
            location,
            started_at: row.started_at,
            completed_at: row.completed_at,
            duration_ms: row.duration_ms,
            error_details: row.error_details,
            artifact_paths: row.artifact_paths,
            metadata,
        })
    }
}

const RUN_COLUMNS: &str = "id, tenant_id, project_id, job_id, status, trigger, location, \
     started_at, completed_at, duration_ms, error_details, artifact_paths, metadata";

#[async_trait]
impl Store for PgStore {
    async fn create_run(&self, new: NewRun) -> Result<Run, StoreError> {
        let id = RunId::generate();
        let metadata = new.metadata.to_value();
        let row: RunRow = sqlx::query_as(&format!(
            "INSERT INTO runs (id, tenant_id, project_id, job_id, status, trigger, location, \
             started_at, artifact_paths, metadata) \
             VALUES ($1, $2, $3, $4, 'queued', $5, $6, now(), '{{}}', $7) \
             RETURNING {RUN_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(new.tenant_id)
        .bind(new.project_id)
        .bind(new.job_id)
        .bind(new.trigger.to_string())
        .bind(new.location.to_string())
        .bind(metadata)
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(run_id = %id, project_id = %new.project_id, "run created");
        row.try_into()
    }

    async fn run(&self, id: RunId) -> Result<Option<Run>, StoreError> {
        let row: Option<RunRow> =
            sqlx::query_as(&format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        row.map(Run::try_from).transpose()
    }

    async fn transition_run(
        &self,
        id: RunId,
        from: RunStatus,
        to: RunStatus,
        patch: RunPatch,
    ) -> Result<Run, StoreError> {
        let terminal = to.is_terminal();
        let row: Option<RunRow> = sqlx::query_as(&format!(
            "UPDATE runs SET \
               status = $3, \
               completed_at = CASE WHEN $4 THEN now() ELSE completed_at END, \
               duration_ms = CASE WHEN $4 THEN COALESCE($5, \
                   (EXTRACT(EPOCH FROM (now() - started_at)) * 1000)::bigint) \
                   ELSE duration_ms END, \
               error_details = COALESCE($6, error_details), \
               artifact_paths = COALESCE($7, artifact_paths) \
             WHERE id = $1 AND status = $2 \
             RETURNING {RUN_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(from.to_string())
        .bind(to.to_string())
        .bind(terminal)
        .bind(patch.duration_ms)
        .bind(patch.error_details)
        .bind(patch.artifact_paths)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                tracing::info!(run_id = %id, from = %from, to = %to, "run transitioned");
                row.try_into()
            }
            None => {
                let current: Option<(String,)> =
                    sqlx::query_as("SELECT status FROM runs WHERE id = $1")
                        .bind(id.as_uuid())
                        .fetch_optional(&self.pool)
                        .await?;
                match current {
                    Some((status,)) => {
                        let current = RunStatus::parse(&status).ok_or_else(|| {
                            StoreError::CorruptRow(format!("run status {status:?}"))
                        })?;
                        Err(StoreError::StateConflict { expected: from, current })
                    }
                    None => Err(StoreError::NotFound(format!("run {id}"))),
                }
            }
        }
    }

    async fn cancel_run(&self, id: RunId) -> Result<Option<Run>, StoreError> {
        let row: Option<RunRow> = sqlx::query_as(&format!(
            "UPDATE runs SET \
               status = 'cancelled', \
               completed_at = now(), \
               duration_ms = (EXTRACT(EPOCH FROM (now() - started_at)) * 1000)::bigint \
             WHERE id = $1 AND status IN ('queued', 'running') \
             RETURNING {RUN_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row.try_into()?)),
            None => {
                // Already terminal (terminal status wins) or missing.
                let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM runs WHERE id = $1")
                    .bind(id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await?;
                if exists.is_some() {
                    Ok(None)
                } else {
                    Err(StoreError::NotFound(format!("run {id}")))
                }
            }
        }
    }

    async fn count_runs(
        &self,
        project_id: Uuid,
        statuses: &[RunStatus],
    ) -> Result<i64, StoreError> {
        let names: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM runs WHERE project_id = $1 AND status = ANY($2)",
        )
        .bind(project_id)
        .bind(&names)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn queued_position(&self, project_id: Uuid, run: RunId) -> Result<i64, StoreError> {
        // UUIDv7 ids order by creation time, so `id < $2` is "created earlier".
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM runs \
             WHERE project_id = $1 AND status = 'queued' AND id < $2",
        )
        .bind(project_id)
        .bind(run.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn organization(&self, id: Uuid) -> Result<Option<Organization>, StoreError> {
        let row: Option<(Uuid, Option<Uuid>, String)> = sqlx::query_as(
            "SELECT id, plan_id, subscription_status FROM organizations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|(id, plan_id, status)| {
            let subscription_status = SubscriptionStatus::parse(&status)
                .ok_or_else(|| StoreError::CorruptRow(format!("subscription {status:?}")))?;
            Ok(Organization { id, plan_id, subscription_status })
        })
        .transpose()
    }

    async fn organizations(&self) -> Result<Vec<Organization>, StoreError> {
        let rows: Vec<(Uuid, Option<Uuid>, String)> =
            sqlx::query_as("SELECT id, plan_id, subscription_status FROM organizations")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter()
            .map(|(id, plan_id, status)| {
                let subscription_status = SubscriptionStatus::parse(&status)
                    .ok_or_else(|| StoreError::CorruptRow(format!("subscription {status:?}")))?;
                Ok(Organization { id, plan_id, subscription_status })
            })
            .collect()
    }

    async fn project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        let row: Option<(Uuid, Uuid, String)> =
            sqlx::query_as("SELECT id, tenant_id, slug FROM projects WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, tenant_id, slug)| Project { id, tenant_id, slug }))
    }

    async fn plan_limits(&self, tenant_id: Uuid) -> Result<PlanLimits, StoreError> {
        let row: Option<(i64, i64, i64, i64, i64, i64)> = sqlx::query_as(
            "SELECT pl.running_capacity, pl.queued_capacity, pl.max_monitors, \
                    pl.included_minutes, pl.included_credits, pl.data_retention_days \
             FROM organizations o \
             JOIN plan_limits pl ON pl.plan_id = o.plan_id \
             WHERE o.id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(match row {
            Some((running, queued, monitors, minutes, credits, retention)) => PlanLimits {
                running_capacity: running,
                queued_capacity: queued,
                max_monitors: monitors,
                included_minutes: minutes,
                included_credits: credits,
                data_retention_days: retention,
            },
            None => PlanLimits::free_tier(),
        })
    }

    async fn resolve_project_variables(
        &self,
        project_id: Uuid,
    ) -> Result<ResolvedVariables, StoreError> {
        let rows: Vec<(String, String, bool)> = sqlx::query_as(
            "SELECT key, value, is_secret FROM project_variables WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        let mut resolved = ResolvedVariables::default();
        for (key, value, is_secret) in rows {
            if is_secret {
                let Some(cipher) = &self.cipher else {
                    return Err(StoreError::SecretsKey(
                        "SC_SECRETS_KEY not configured but project has secret variables"
                            .to_string(),
                    ));
                };
                let plaintext = cipher
                    .decrypt(project_id, &value)
                    .map_err(|_| StoreError::SecretDecrypt(key.clone()))?;
                resolved.secrets.insert(key, plaintext);
            } else {
                resolved.vars.insert(key, value);
            }
        }
        Ok(resolved)
    }

    async fn test_definition(&self, id: Uuid) -> Result<Option<TestDefinition>, StoreError> {
        let row: Option<(Uuid, Uuid, Uuid, String, String, Option<i64>)> = sqlx::query_as(
            "SELECT id, tenant_id, project_id, type, script, timeout_ms FROM tests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|(id, tenant_id, project_id, test_type, script, timeout_ms)| {
            let test_type = TestType::parse(&test_type)
                .ok_or_else(|| StoreError::CorruptRow(format!("test type {test_type:?}")))?;
            Ok(TestDefinition {
                id,
                tenant_id,
                project_id,
                test_type,
                script,
                timeout_ms: timeout_ms.map(|ms| ms as u64),
            })
        })
        .transpose()
    }

    async fn scheduled_jobs(&self) -> Result<Vec<ScheduledJob>, StoreError> {
        let rows: Vec<(Uuid, Uuid, Uuid, String, Option<String>, String, Vec<Uuid>)> =
            sqlx::query_as(
                "SELECT id, tenant_id, project_id, job_type, schedule, location, test_ids \
                 FROM jobs WHERE schedule IS NOT NULL",
            )
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|(id, tenant_id, project_id, job_type, schedule, location, test_ids)| {
                let job_type = match job_type.as_str() {
                    "browser" => JobType::Browser,
                    "performance" => JobType::Performance,
                    other => {
                        return Err(StoreError::CorruptRow(format!("job type {other:?}")))
                    }
                };
                Ok(ScheduledJob {
                    id,
                    tenant_id,
                    project_id,
                    job_type,
                    schedule,
                    location: Location::normalize(&location),
                    test_ids,
                })
            })
            .collect()
    }

    async fn upsert_report(&self, report: Report) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO reports (entity_type, entity_id, report_path, s3_url, status) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (entity_type, entity_id) DO UPDATE \
             SET report_path = EXCLUDED.report_path, \
                 s3_url = EXCLUDED.s3_url, \
                 status = EXCLUDED.status",
        )
        .bind(report.entity_type.to_string())
        .bind(report.entity_id)
        .bind(&report.report_path)
        .bind(&report.s3_url)
        .bind(report.status.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn report_for_run(&self, run: RunId) -> Result<Option<Report>, StoreError> {
        let row: Option<(String, Uuid, String, String, String)> = sqlx::query_as(
            "SELECT entity_type, entity_id, report_path, s3_url, status \
             FROM reports WHERE entity_type = 'run' AND entity_id = $1",
        )
        .bind(run.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|(entity_type, entity_id, report_path, s3_url, status)| {
            let entity_type = ReportEntity::parse(&entity_type)
                .ok_or_else(|| StoreError::CorruptRow(format!("report entity {entity_type:?}")))?;
            let status = RunStatus::parse(&status)
                .ok_or_else(|| StoreError::CorruptRow(format!("report status {status:?}")))?;
            Ok(Report { entity_type, entity_id, report_path, s3_url, status })
        })
        .transpose()
    }

    async fn insert_usage_event(&self, event: NewUsageEvent) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO usage_events (id, tenant_id, window_id, kind, units, run_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, now()) \
             ON CONFLICT (tenant_id, run_id, kind) WHERE run_id IS NOT NULL DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(event.tenant_id)
        .bind(&event.window_id)
        .bind(event.kind.to_string())
        .bind(event.units)
        .bind(event.run_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn unsynced_usage_events(&self, limit: i64) -> Result<Vec<UsageEvent>, StoreError> {
        let rows: Vec<(Uuid, Uuid, String, String, i64, Option<Uuid>, DateTime<Utc>)> =
            sqlx::query_as(
                "SELECT id, tenant_id, window_id, kind, units, run_id, created_at \
                 FROM usage_events WHERE synced_at IS NULL ORDER BY created_at LIMIT $1",
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|(id, tenant_id, window_id, kind, units, run_id, created_at)| {
                let kind = UsageKind::parse(&kind)
                    .ok_or_else(|| StoreError::CorruptRow(format!("usage kind {kind:?}")))?;
                Ok(UsageEvent {
                    id,
                    tenant_id,
                    window_id,
                    kind,
                    units,
                    run_id,
                    created_at,
                    synced_at: None,
                })
            })
            .collect()
    }

    async fn mark_usage_synced(&self, ids: &[Uuid]) -> Result<(), StoreError> {
        sqlx::query("UPDATE usage_events SET synced_at = now() WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn identity_for_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<TokenIdentity>, StoreError> {
        let row: Option<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT tenant_id, project_id FROM api_tokens \
             WHERE token_hash = $1 AND revoked_at IS NULL",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(tenant_id, project_id)| TokenIdentity { tenant_id, project_id }))
    }

    async fn expired_run_ids(
        &self,
        tenant_id: Uuid,
        retention_days: i64,
    ) -> Result<Vec<RunId>, StoreError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM runs \
             WHERE tenant_id = $1 \
               AND status IN ('passed', 'failed', 'error', 'cancelled', 'timed_out') \
               AND completed_at < now() - make_interval(days => $2::int)",
        )
        .bind(tenant_id)
        .bind(retention_days)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| RunId(id)).collect())
    }

    async fn delete_runs(&self, ids: &[RunId]) -> Result<u64, StoreError> {
        let raw: Vec<Uuid> = ids.iter().map(|r| r.as_uuid()).collect();
        let result = sqlx::query("DELETE FROM runs WHERE id = ANY($1)")
            .bind(&raw)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
