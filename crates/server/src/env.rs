// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the app-node binary.

pub fn database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

pub fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

pub fn http_addr() -> String {
    std::env::var("SC_HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:3100".to_string())
}

pub fn app_url() -> Option<String> {
    std::env::var("APP_URL").ok()
}

pub fn status_page_domain() -> Option<String> {
    std::env::var("STATUS_PAGE_DOMAIN").ok()
}

/// `SELF_HOSTED=true` disables subscription enforcement.
pub fn self_hosted() -> bool {
    std::env::var("SELF_HOSTED").map(|v| v == "true" || v == "1").unwrap_or(false)
}

pub fn location_filtering() -> bool {
    std::env::var("ENABLE_LOCATION_FILTERING")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

/// Shared secret guarding the cron-only endpoints.
pub fn cron_secret() -> Option<String> {
    std::env::var("CRON_SECRET").ok().filter(|s| !s.is_empty())
}

/// Submissions per tenant per minute through the rate limiter.
pub fn submit_rate_limit() -> u32 {
    std::env::var("SC_SUBMIT_RATE_LIMIT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(120)
}
