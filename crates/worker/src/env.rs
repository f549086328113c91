// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the worker binary.

use sc_core::Location;
use std::time::Duration;

pub fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

pub fn database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

/// Region this worker is pinned to. Unset or unknown means `global`
/// (consume every region).
pub fn worker_location() -> Location {
    match std::env::var("WORKER_LOCATION") {
        Ok(raw) => Location::normalize(&raw),
        Err(_) => Location::Global,
    }
}

pub fn location_filtering() -> bool {
    std::env::var("ENABLE_LOCATION_FILTERING")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

/// Cap on simultaneous in-flight load tests per worker.
pub fn k6_max_concurrency() -> usize {
    std::env::var("K6_MAX_CONCURRENCY")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(3)
}

pub fn k6_bin_path() -> String {
    std::env::var("K6_BIN_PATH").unwrap_or_else(|_| "k6".to_string())
}

pub fn playwright_bin_path() -> String {
    std::env::var("PLAYWRIGHT_BIN_PATH").unwrap_or_else(|_| "playwright".to_string())
}

/// Hard wall-clock budget for a run when neither the test nor the request
/// overrides it.
pub fn default_run_timeout() -> Duration {
    std::env::var("SC_RUN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(600))
}

/// Queue visibility must exceed the run timeout, or healthy runs would be
/// reclaimed mid-flight.
pub fn lease_visibility(run_timeout: Duration) -> Duration {
    run_timeout + Duration::from_secs(120)
}

/// Grace between SIGTERM and SIGKILL.
pub fn kill_grace() -> Duration {
    std::env::var("SC_KILL_GRACE_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(10))
}

/// Cancellation poll cadence during execution.
pub fn cancel_poll_interval() -> Duration {
    std::env::var("SC_CANCEL_POLL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(1))
}

/// Domain serving status pages; probes for hosted pages pin to it.
pub fn status_page_domain() -> Option<String> {
    std::env::var("STATUS_PAGE_DOMAIN").ok().filter(|s| !s.is_empty())
}

pub fn bucket_runs() -> String {
    std::env::var("SC_BUCKET_RUNS").unwrap_or_else(|_| "supercheck-runs".to_string())
}

pub fn bucket_reports() -> String {
    std::env::var("SC_BUCKET_REPORTS").unwrap_or_else(|_| "supercheck-reports".to_string())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
