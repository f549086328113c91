// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run submission and cancellation.

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sc_admission::SubmitRequest;
use sc_core::{ErrorKind, RunId, RunMetadata, RunPatch, RunStatus, TestType, Trigger};
use sc_store::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    pub project_id: Uuid,
    /// Test kind: `browser | api | performance | synthetic`.
    pub kind: String,
    /// Inline base64 script; mutually exclusive with `test_id`.
    pub script: Option<String>,
    pub test_id: Option<Uuid>,
    pub location: Option<String>,
    #[serde(default)]
    pub options: SubmitOptions,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitOptions {
    pub timeout_ms: Option<u64>,
    /// Units for credit-metered operations (AI-backed generation).
    pub credit_units: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub run_id: RunId,
    pub status: RunStatus,
    pub position: i64,
}

/// `POST /runs` — admit a submission. 202 on success.
pub async fn submit(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<SubmitBody>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    // The token is project-scoped; a mismatched body is a cross-tenant
    // probe, not a validation slip.
    if body.project_id != auth.identity.project_id {
        state.audit.record(
            "cross_tenant_submit",
            Some(auth.identity.tenant_id),
            format!("token not scoped to project {}", body.project_id),
        );
        return Err(ApiError::forbidden("token is not scoped to this project"));
    }

    if let Some(limiter) = &state.ratelimit {
        let scope = auth.identity.tenant_id.to_string();
        match limiter
            .check(&scope, state.config.submit_rate_limit, Duration::from_secs(60))
            .await
        {
            Ok(true) => {}
            Ok(false) => return Err(ApiError::rate_limited()),
            // Fail open: a limiter outage must not take submissions down.
            Err(e) => tracing::warn!(error = %e, "rate limiter unavailable"),
        }
    }

    let test_type = TestType::parse(&body.kind).ok_or_else(|| ApiError {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        kind: ErrorKind::Validation,
        message: format!("unknown kind {:?}", body.kind),
        field: Some("kind"),
    })?;
    let metadata = match body.metadata {
        Some(value) => RunMetadata::from_value(value).map_err(|message| ApiError {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            kind: ErrorKind::Validation,
            message,
            field: Some("metadata"),
        })?,
        None => RunMetadata::default(),
    };

    let outcome = state
        .admission
        .submit(SubmitRequest {
            tenant_id: auth.identity.tenant_id,
            project_id: body.project_id,
            test_type,
            script_b64: body.script,
            test_id: body.test_id,
            location: body.location,
            trigger: Trigger::Api,
            metadata,
            timeout_ms: body.options.timeout_ms,
            credit_units: body.options.credit_units,
            job_id: None,
        })
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            run_id: outcome.run.id,
            status: outcome.run.status,
            position: outcome.position,
        }),
    ))
}

/// `POST /runs/{id}/cancel` — accept a cancellation signal. 202 always
/// (effective cancellation is eventual).
pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let run_id = RunId(id);
    let run = state
        .store
        .run(run_id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::not_found("run"))?;
    if run.project_id != auth.identity.project_id || run.tenant_id != auth.identity.tenant_id {
        state.audit.record(
            "cross_tenant_cancel",
            Some(auth.identity.tenant_id),
            format!("cancel of foreign run {run_id}"),
        );
        return Err(ApiError::forbidden("run does not belong to this project"));
    }

    state.cancel.signal(run_id).await.map_err(ApiError::internal)?;

    // Queued runs settle immediately; running runs settle when the worker
    // observes the flag (the worker writes `cancelled` after its child
    // exits). Terminal runs win over the cancel.
    if run.status == RunStatus::Queued {
        match state
            .store
            .transition_run(run_id, RunStatus::Queued, RunStatus::Cancelled, RunPatch::default())
            .await
        {
            Ok(_) | Err(StoreError::StateConflict { .. }) => {}
            Err(e) => return Err(ApiError::internal(e)),
        }
    }

    Ok((StatusCode::ACCEPTED, Json(json!({"run_id": run_id, "status": "cancelling"}))))
}

#[cfg(test)]
#[path = "runs_tests.rs"]
mod tests;
