// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Billing windows.

use chrono::{DateTime, Datelike, Utc};

/// Window id for a point in time: `YYYYMM` (UTC).
pub fn window_for(at: DateTime<Utc>) -> String {
    format!("{:04}{:02}", at.year(), at.month())
}

pub fn current_window() -> String {
    window_for(Utc::now())
}

/// Counter TTL: generously past the window's end so late writes still land,
/// short enough that Redis self-cleans.
pub const WINDOW_TTL_SECS: u64 = 40 * 24 * 60 * 60;

#[cfg(test)]
#[path = "window_tests.rs"]
mod tests;
