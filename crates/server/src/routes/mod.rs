// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP route table.

pub mod cron;
pub mod events;
pub mod health;
pub mod runs;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/runs", post(runs::submit))
        .route("/runs/{id}/cancel", post(runs::cancel))
        .route("/events/runs/{id}", get(events::run_events))
        .route("/events/tests/{id}", get(events::test_events))
        .route("/events/jobs", get(events::job_events))
        .route("/internal/cron/tick", post(cron::tick))
        .route("/healthz", get(health::healthz))
        .with_state(state)
}
