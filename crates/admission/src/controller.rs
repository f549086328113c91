// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The admission pipeline.

use crate::router::RegionRouter;
use crate::validate::validate_load_test_script;
use crate::{AdmissionError, AdmittedAs};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use sc_core::{Run, RunMetadata, RunPayload, RunPatch, RunStatus, TestType, Trigger};
use sc_queue::{EnqueueOpts, Substrate};
use sc_store::{NewRun, Store, UsageKind};
use sc_usage::CreditLedger;
use std::sync::Arc;
use uuid::Uuid;

/// Default delivery attempts for execution jobs (one retry after a stall
/// or transient failure).
pub const DEFAULT_ATTEMPTS: u32 = 2;

/// A submission, as assembled by the HTTP boundary.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub test_type: TestType,
    /// Inline base64 script; mutually exclusive with `test_id`.
    pub script_b64: Option<String>,
    /// Saved test to execute.
    pub test_id: Option<Uuid>,
    /// Raw location string from the boundary; normalized here.
    pub location: Option<String>,
    pub trigger: Trigger,
    pub metadata: RunMetadata,
    pub timeout_ms: Option<u64>,
    /// Units to charge for credit-metered operations.
    pub credit_units: Option<i64>,
    pub job_id: Option<Uuid>,
}

/// Successful admission.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub run: Run,
    /// Count of earlier still-queued runs in the project.
    pub position: i64,
    pub admitted_as: AdmittedAs,
}

pub struct AdmissionController<S: ?Sized, Q: ?Sized, L: ?Sized> {
    store: Arc<S>,
    substrate: Arc<Q>,
    ledger: Arc<L>,
    router: RegionRouter,
    /// `SELF_HOSTED=true` disables the subscription gate.
    self_hosted: bool,
}

impl<S, Q, L> AdmissionController<S, Q, L>
where
    S: Store + ?Sized,
    Q: Substrate + ?Sized,
    L: CreditLedger + ?Sized,
{
    pub fn new(
        store: Arc<S>,
        substrate: Arc<Q>,
        ledger: Arc<L>,
        router: RegionRouter,
        self_hosted: bool,
    ) -> Self {
        Self { store, substrate, ledger, router, self_hosted }
    }

    /// Run the full admission pipeline for one submission.
    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmitOutcome, AdmissionError> {
        // Tenancy first: both ids must match (defense-in-depth).
        let project = self
            .store
            .project(request.project_id)
            .await?
            .ok_or_else(|| AdmissionError::Validation {
                field: "project_id",
                message: "unknown project".to_string(),
            })?;
        if project.tenant_id != request.tenant_id {
            tracing::warn!(
                tenant = %request.tenant_id,
                project = %request.project_id,
                "cross-tenant submission rejected"
            );
            return Err(AdmissionError::Forbidden("project does not belong to tenant".to_string()));
        }

        // 1. Subscription standing (cloud mode only).
        if !self.self_hosted {
            let org = self
                .store
                .organization(request.tenant_id)
                .await?
                .ok_or(AdmissionError::SubscriptionRequired)?;
            if !org.subscription_status.is_active() {
                return Err(AdmissionError::SubscriptionRequired);
            }
        }

        // 2. Plan limits, resolved once.
        let limits = self.store.plan_limits(request.tenant_id).await?;

        // 3. Capacity.
        let running = self.store.count_runs(project.id, &[RunStatus::Running]).await?;
        let queued = self.store.count_runs(project.id, &[RunStatus::Queued]).await?;
        if running >= limits.running_capacity && queued >= limits.queued_capacity {
            return Err(AdmissionError::CapacityExceeded {
                running,
                running_capacity: limits.running_capacity,
                queued,
                queued_capacity: limits.queued_capacity,
            });
        }
        let admitted_as = if running < limits.running_capacity {
            AdmittedAs::RunnableNow
        } else {
            AdmittedAs::Queued
        };

        // 4. Credit gate for metered operations.
        let charged = match request.credit_units {
            Some(units) => {
                let decision = self
                    .ledger
                    .consume_credit(request.tenant_id, UsageKind::AiCredits, units, None)
                    .await?;
                if !decision.allowed {
                    return Err(AdmissionError::CreditsExhausted {
                        used: decision.used,
                        limit: decision.limit,
                    });
                }
                Some(units)
            }
            None => None,
        };

        // Everything past the charge must refund it on failure.
        let tenant_id = request.tenant_id;
        match self.admit_charged(request, admitted_as).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                if let Some(units) = charged {
                    if let Err(refund_err) =
                        self.ledger.refund_credit(tenant_id, UsageKind::AiCredits, units).await
                    {
                        tracing::error!(error = %refund_err, "credit refund failed");
                    }
                }
                Err(err)
            }
        }
    }

    /// Steps 5–6: validation, then create + enqueue as one unit of work.
    async fn admit_charged(
        &self,
        request: SubmitRequest,
        admitted_as: AdmittedAs,
    ) -> Result<SubmitOutcome, AdmissionError> {
        // 5. Script resolution and validation.
        let (script, test_timeout) = self.resolve_script(&request).await?;
        if request.test_type == TestType::Performance {
            validate_load_test_script(&script).map_err(|issue| AdmissionError::Validation {
                field: "script",
                message: issue.to_string(),
            })?;
        }
        let location = match &request.location {
            Some(raw) => sc_core::Location::normalize(raw),
            None => sc_core::Location::Global,
        };

        // Variables and secrets resolve once, at admission time.
        let resolved = self.store.resolve_project_variables(request.project_id).await?;

        // 6. Create + enqueue as a unit of work.
        let mut metadata = request.metadata.clone();
        if metadata.test_id.is_none() {
            metadata.test_id = request.test_id;
        }
        if metadata.test_type.is_none() {
            metadata.test_type = Some(request.test_type.to_string());
        }
        let run = self
            .store
            .create_run(NewRun {
                tenant_id: request.tenant_id,
                project_id: request.project_id,
                job_id: request.job_id,
                trigger: request.trigger,
                location,
                metadata,
            })
            .await?;

        let mut payload = RunPayload::new(run.id, request.test_type, script);
        payload.location = location;
        payload.vars = resolved.vars;
        payload.secrets = resolved.secrets;
        payload.timeout_ms = request.timeout_ms.or(test_timeout);

        let routed = self
            .router
            .enqueue_queue(self.substrate.as_ref(), request.test_type.exec_kind(), location)
            .await;
        let queue = match routed {
            Ok(queue) => queue,
            Err(e) => return Err(self.fail_enqueued_run(run.id, e).await),
        };
        let payload_json = serde_json::to_value(&payload)
            .map_err(|e| AdmissionError::Validation { field: "script", message: e.to_string() })?;
        let opts = EnqueueOpts::with_run(run.id, request.trigger).attempts(DEFAULT_ATTEMPTS);
        if let Err(e) = self.substrate.enqueue(&queue.to_string(), &payload_json, opts).await {
            return Err(self.fail_enqueued_run(run.id, e).await);
        }

        let position = self.store.queued_position(request.project_id, run.id).await?;
        tracing::info!(
            run_id = %run.id,
            queue = %queue,
            position,
            trigger = %request.trigger,
            "run admitted"
        );
        Ok(SubmitOutcome { run, position, admitted_as })
    }

    async fn resolve_script(
        &self,
        request: &SubmitRequest,
    ) -> Result<(String, Option<u64>), AdmissionError> {
        let (encoded, timeout) = match (&request.script_b64, request.test_id) {
            (Some(inline), _) => (inline.clone(), None),
            (None, Some(test_id)) => {
                let test = self.store.test_definition(test_id).await?.ok_or_else(|| {
                    AdmissionError::Validation {
                        field: "test_id",
                        message: "unknown test".to_string(),
                    }
                })?;
                // Both ids must match the caller's scope.
                if test.tenant_id != request.tenant_id || test.project_id != request.project_id {
                    return Err(AdmissionError::Forbidden(
                        "test does not belong to tenant".to_string(),
                    ));
                }
                (test.script, test.timeout_ms)
            }
            (None, None) => {
                return Err(AdmissionError::Validation {
                    field: "script",
                    message: "either script or test_id is required".to_string(),
                })
            }
        };
        let decoded = B64.decode(encoded.trim()).map_err(|_| AdmissionError::Validation {
            field: "script",
            message: "script must be base64".to_string(),
        })?;
        let script = String::from_utf8(decoded).map_err(|_| AdmissionError::Validation {
            field: "script",
            message: "script must be UTF-8 text".to_string(),
        })?;
        if script.trim().is_empty() {
            return Err(AdmissionError::Validation {
                field: "script",
                message: "script is empty".to_string(),
            });
        }
        Ok((script, timeout))
    }

    /// Enqueue failed after the row was created: the row must not stay
    /// `queued` (nothing will ever lease it).
    async fn fail_enqueued_run(
        &self,
        run_id: sc_core::RunId,
        error: sc_queue::QueueError,
    ) -> AdmissionError {
        tracing::error!(run_id = %run_id, error = %error, "enqueue failed, marking run error");
        let patch = RunPatch {
            error_details: Some("enqueue failed".to_string()),
            ..RunPatch::default()
        };
        if let Err(e) = self
            .store
            .transition_run(run_id, RunStatus::Queued, RunStatus::Error, patch)
            .await
        {
            tracing::error!(run_id = %run_id, error = %e, "error rollback failed");
        }
        AdmissionError::EnqueueFailed { run_id }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
