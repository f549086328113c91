// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSE gateway.
//!
//! Three endpoint families: per-run, per-test, and the tenant firehose.
//! Authorization runs once at connect; per-event ownership is re-verified
//! against a bounded per-connection cache. Client aborts tear down the hub
//! subscription via drop.

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::hub::HubMessage;
use crate::sse::{
    connected_event, dropped_event, snapshot_event, status_event, RunLookupCache, HEARTBEAT,
};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use sc_core::{EventCategory, NormalizedQueueEvent, RunId, RunStatus};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

type EventStream = Sse<KeepAliveStream<ReceiverStream<Result<Event, std::convert::Infallible>>>>;

fn sse_response(
    rx: mpsc::Receiver<Result<Event, std::convert::Infallible>>,
) -> EventStream {
    Sse::new(ReceiverStream::new(rx))
        .keep_alive(KeepAlive::new().interval(HEARTBEAT).text("ping"))
}

/// `GET /events/runs/{id}` — one run's lifecycle.
pub async fn run_events(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<EventStream, ApiError> {
    let run_id = RunId(id);
    let run = state
        .store
        .run(run_id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::not_found("run"))?;
    if run.project_id != auth.identity.project_id || run.tenant_id != auth.identity.tenant_id {
        return Err(ApiError::forbidden("run does not belong to this project"));
    }

    // Subscribe before the snapshot so nothing falls between them.
    let mut subscription = state.hub.subscribe();
    let (tx, rx) = mpsc::channel(16);

    tokio::spawn(async move {
        if tx.send(Ok(connected_event())).await.is_err() {
            return;
        }
        let snapshot = json!({
            "run_id": run.id,
            "status": run.status,
            "error_details": run.error_details,
            "artifact_paths": if run.status.is_terminal() { Some(&run.artifact_paths) } else { None },
            "completed_at": run.completed_at,
        });
        if tx.send(Ok(snapshot_event(snapshot))).await.is_err() {
            return;
        }

        loop {
            let message = subscription.recv().await;
            let event = match message {
                HubMessage::Dropped(count) => dropped_event(count),
                HubMessage::Event(event) => {
                    if event.run_id != Some(run_id) {
                        continue;
                    }
                    let extra = if event.status.is_terminal() {
                        terminal_extras(&state, run_id).await
                    } else {
                        None
                    };
                    status_event(&event, extra)
                }
            };
            if tx.send(Ok(event)).await.is_err() {
                return; // client went away; Drop unsubscribes
            }
        }
    });

    Ok(sse_response(rx))
}

/// Fresh artifact references for terminal events.
async fn terminal_extras(state: &AppState, run_id: RunId) -> Option<serde_json::Value> {
    let run = state.store.run(run_id).await.ok().flatten()?;
    let report_url = match state.store.report_for_run(run_id).await {
        Ok(report) => report.map(|r| r.s3_url),
        Err(e) => {
            tracing::warn!(run_id = %run_id, error = %e, "report lookup failed");
            None
        }
    };
    Some(json!({
        "artifact_paths": run.artifact_paths,
        "report_url": report_url,
        "error_details": run.error_details,
    }))
}

/// `GET /events/tests/{id}` — test-scoped events.
///
/// Saved tests authorize by ownership; playground runs authorize by the
/// test id carried in run metadata. Either way, every event's run must
/// belong to the caller's project.
pub async fn test_events(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(test_id): Path<Uuid>,
) -> Result<EventStream, ApiError> {
    if let Some(test) = state.store.test_definition(test_id).await.map_err(ApiError::internal)? {
        if test.project_id != auth.identity.project_id
            || test.tenant_id != auth.identity.tenant_id
        {
            return Err(ApiError::forbidden("test does not belong to this project"));
        }
    }

    let mut subscription = state.hub.subscribe();
    let (tx, rx) = mpsc::channel(16);
    let identity = auth.identity.clone();

    tokio::spawn(async move {
        if tx.send(Ok(connected_event())).await.is_err() {
            return;
        }
        let mut cache = RunLookupCache::new();
        loop {
            let message = subscription.recv().await;
            let event = match message {
                HubMessage::Dropped(count) => dropped_event(count),
                HubMessage::Event(mut event) => {
                    if event.category != EventCategory::Test {
                        continue;
                    }
                    let Some(run_id) = event.run_id else { continue };
                    let cached = match cache.resolve(state.store.as_ref(), run_id).await {
                        Ok(Some(cached)) => cached,
                        Ok(None) => continue,
                        Err(e) => {
                            tracing::warn!(error = %e, "run lookup failed, event skipped");
                            continue;
                        }
                    };
                    if cached.project_id != identity.project_id
                        || cached.tenant_id != identity.tenant_id
                        || cached.test_id != Some(test_id)
                    {
                        continue;
                    }
                    // Fail-safe rule (test endpoint only): a successful
                    // queue completion must agree with the report row.
                    if event.status == RunStatus::Passed {
                        event.status = confirm_with_report(&state, run_id).await;
                    }
                    status_event(&event, None)
                }
            };
            if tx.send(Ok(event)).await.is_err() {
                return;
            }
        }
    });

    Ok(sse_response(rx))
}

async fn confirm_with_report(state: &AppState, run_id: RunId) -> RunStatus {
    match state.store.report_for_run(run_id).await {
        Ok(Some(report)) if report.status == RunStatus::Passed => RunStatus::Passed,
        Ok(_) => {
            tracing::warn!(run_id = %run_id, "queue success disagrees with report, surfacing failed");
            RunStatus::Failed
        }
        Err(e) => {
            tracing::warn!(run_id = %run_id, error = %e, "report check failed, surfacing failed");
            RunStatus::Failed
        }
    }
}

/// `GET /events/jobs` — tenant-wide firehose, filtered to the caller's
/// project.
pub async fn job_events(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<EventStream, ApiError> {
    let mut subscription = state.hub.subscribe();
    let (tx, rx) = mpsc::channel(16);
    let identity = auth.identity.clone();

    tokio::spawn(async move {
        if tx.send(Ok(connected_event())).await.is_err() {
            return;
        }
        let mut cache = RunLookupCache::new();
        loop {
            let message = subscription.recv().await;
            let event = match message {
                HubMessage::Dropped(count) => dropped_event(count),
                HubMessage::Event(event) => {
                    if !authorized(&state, &mut cache, &identity, &event).await {
                        continue;
                    }
                    status_event(&event, None)
                }
            };
            if tx.send(Ok(event)).await.is_err() {
                return;
            }
        }
    });

    Ok(sse_response(rx))
}

async fn authorized(
    state: &AppState,
    cache: &mut RunLookupCache,
    identity: &sc_store::TokenIdentity,
    event: &NormalizedQueueEvent,
) -> bool {
    let Some(run_id) = event.run_id else { return false };
    match cache.resolve(state.store.as_ref(), run_id).await {
        Ok(Some(cached)) => {
            cached.project_id == identity.project_id && cached.tenant_id == identity.tenant_id
        }
        Ok(None) => false,
        Err(e) => {
            tracing::warn!(error = %e, "run lookup failed, event suppressed");
            false
        }
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
