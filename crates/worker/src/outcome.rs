// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal outcome reporting.
//!
//! Uploads artifacts, writes the report row, transitions the run, records
//! execution minutes, clears the cancel flag, and acks the queue job. All
//! terminal writes are idempotent: a `StateConflict` on an already-terminal
//! run is success, and the queue job is still acked.

use crate::runner::RunnerResult;
use crate::sanitize::sanitize_error;
use crate::WorkerError;
use sc_artifact::{ArtifactKey, ArtifactSink, EntityKind};
use sc_core::{Report, ReportEntity, Run, RunPatch, RunPayload, RunStatus};
use sc_queue::{CancelPlane, LeasedJob, Substrate};
use sc_store::{Store, StoreError};
use sc_usage::CreditLedger;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub struct OutcomeReporter<S, Q, A, L, P> {
    store: Arc<S>,
    substrate: Arc<Q>,
    sink: Arc<A>,
    ledger: Arc<L>,
    cancel: Arc<P>,
}

impl<S, Q, A, L, P> OutcomeReporter<S, Q, A, L, P>
where
    S: Store,
    Q: Substrate,
    A: ArtifactSink,
    L: CreditLedger,
    P: CancelPlane,
{
    pub fn new(
        store: Arc<S>,
        substrate: Arc<Q>,
        sink: Arc<A>,
        ledger: Arc<L>,
        cancel: Arc<P>,
    ) -> Self {
        Self { store, substrate, sink, ledger, cancel }
    }

    /// Record a finished execution and settle the queue job.
    pub async fn report(
        &self,
        job: &LeasedJob,
        payload: &RunPayload,
        result: RunnerResult,
    ) -> Result<(), WorkerError> {
        let Some(run) = self.store.run(payload.run_id).await? else {
            tracing::error!(run_id = %payload.run_id, "run row vanished, dropping queue job");
            self.substrate.ack(job, None).await?;
            return Ok(());
        };

        let artifact_keys = self.upload_artifacts(&run, &result).await;
        self.write_report(&run, &result, &artifact_keys).await;

        let patch = RunPatch {
            error_details: result
                .error
                .as_deref()
                .map(|raw| sanitize_error(raw, &payload.secrets)),
            artifact_paths: (!artifact_keys.is_empty())
                .then(|| artifact_keys.iter().map(|(key, _)| key.clone()).collect()),
            duration_ms: Some(result.elapsed.as_millis() as i64),
        };
        match self
            .store
            .transition_run(run.id, RunStatus::Running, result.status, patch)
            .await
        {
            Ok(_) => {}
            Err(StoreError::StateConflict { current, .. }) => {
                // Already terminal (cancel API won, or a stalled twin got
                // here first). The terminal status wins; still ack below.
                tracing::info!(run_id = %run.id, %current, "terminal write was a no-op");
            }
            Err(e) => return Err(e.into()),
        }

        if result.elapsed > Duration::ZERO {
            let minutes = (result.elapsed.as_secs() as i64 + 59) / 60;
            if let Err(e) = self.ledger.record_minutes(run.tenant_id, run.id, minutes).await {
                // Billing must not block completion.
                tracing::warn!(run_id = %run.id, error = %e, "minute record failed");
            }
        }

        if let Err(e) = self.cancel.clear(run.id).await {
            tracing::debug!(run_id = %run.id, error = %e, "cancel flag clear failed");
        }

        let return_value = json!({
            "success": result.success(),
            "status": result.status,
            "duration_ms": result.elapsed.as_millis() as u64,
            "exit_code": result.exit_code,
        });
        self.substrate.ack(job, Some(return_value)).await?;
        tracing::info!(
            run_id = %run.id,
            status = %result.status,
            artifacts = artifact_keys.len(),
            "run settled"
        );
        Ok(())
    }

    /// Upload every artifact file; failures are logged and skipped so one
    /// bad screenshot cannot eat the run. Returns `(object_key, url)`.
    async fn upload_artifacts(&self, run: &Run, result: &RunnerResult) -> Vec<(String, String)> {
        let mut uploaded = Vec::new();
        for artifact in &result.artifacts {
            let key = ArtifactKey::new(
                EntityKind::Run,
                run.tenant_id,
                run.project_id,
                run.id.as_uuid(),
                &artifact.filename,
            );
            let mut attempts = 0;
            loop {
                attempts += 1;
                match self.sink.put_file(&key, &artifact.path).await {
                    Ok(url) => {
                        uploaded.push((key.object_key(), url));
                        break;
                    }
                    Err(e) if attempts < 3 && matches!(e, sc_artifact::ArtifactError::Store(_)) => {
                        tokio::time::sleep(Duration::from_millis(200 * attempts)).await;
                    }
                    Err(e) => {
                        tracing::warn!(
                            run_id = %run.id,
                            artifact = %artifact.filename,
                            error = %e,
                            "artifact upload dropped"
                        );
                        break;
                    }
                }
            }
        }
        uploaded
    }

    /// The structured result document becomes the run's report row.
    ///
    /// Runs with no result file on disk (probes) still get a report: the
    /// summary value is stored directly, so the report-agreement check on
    /// the test SSE endpoint has something to agree with.
    async fn write_report(
        &self,
        run: &Run,
        result: &RunnerResult,
        artifact_keys: &[(String, String)],
    ) {
        let report_artifact = artifact_keys
            .iter()
            .find(|(key, _)| key.ends_with("results.json") || key.ends_with("summary.json"));
        let (report_path, s3_url) = match report_artifact {
            Some((key, url)) => (key.clone(), url.clone()),
            None => {
                let Some(summary) = &result.summary else { return };
                let key = ArtifactKey::new(
                    EntityKind::Report,
                    run.tenant_id,
                    run.project_id,
                    run.id.as_uuid(),
                    "report.json",
                );
                match self.sink.put(&key, bytes::Bytes::from(summary.to_string())).await {
                    Ok(url) => (key.object_key(), url),
                    Err(e) => {
                        tracing::warn!(run_id = %run.id, error = %e, "summary report upload failed");
                        return;
                    }
                }
            }
        };
        let report = Report {
            entity_type: ReportEntity::Run,
            entity_id: run.id.as_uuid(),
            report_path,
            s3_url,
            status: result.status,
        };
        if let Err(e) = self.store.upsert_report(report).await {
            tracing::warn!(run_id = %run.id, error = %e, "report row write failed");
        }
    }
}

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;
