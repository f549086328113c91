// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error detail sanitization.
//!
//! User-script failures go into the run row and back out over the API, so
//! they are capped at 8 KiB and secret values are scrubbed.

use std::collections::HashMap;

/// Cap on stored error details.
pub const ERROR_DETAIL_LIMIT: usize = 8 * 1024;

/// Truncate to the cap and replace every secret value with a placeholder.
pub fn sanitize_error(raw: &str, secrets: &HashMap<String, String>) -> String {
    let mut out = raw.to_string();
    for (key, value) in secrets {
        if value.len() >= 4 {
            out = out.replace(value.as_str(), &format!("<{key}>"));
        }
    }
    truncate_on_char_boundary(out, ERROR_DETAIL_LIMIT)
}

fn truncate_on_char_boundary(mut s: String, limit: usize) -> String {
    if s.len() <= limit {
        return s;
    }
    let mut end = limit;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
    s.push_str("… [truncated]");
    s
}

#[cfg(test)]
#[path = "sanitize_tests.rs"]
mod tests;
