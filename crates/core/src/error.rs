// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-crate error taxonomy.
//!
//! Internals use per-crate `thiserror` enums; this marker kind is what the
//! HTTP boundary maps onto status codes, and what logs tag errors with.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed submission, bad script, invalid location.
    Validation,
    /// Missing/invalid permission, cross-tenant access.
    Authorization,
    /// Tenant not entitled.
    Subscription,
    /// Running and queued slots both exhausted.
    Capacity,
    /// Transition from an unexpected state; recovered locally.
    StateConflict,
    /// DB/Redis/object-store blip; retried at the site.
    TransientIo,
    /// Child process exceeded its wall-clock budget.
    Timeout,
    /// Normal termination via the cancellation plane.
    Cancelled,
    /// Anything unclassified.
    Internal,
}

crate::simple_display! {
    ErrorKind {
        Validation => "validation",
        Authorization => "authorization",
        Subscription => "subscription",
        Capacity => "capacity",
        StateConflict => "state_conflict",
        TransientIo => "transient_io",
        Timeout => "timeout",
        Cancelled => "cancelled",
        Internal => "internal",
    }
}

impl ErrorKind {
    /// Whether the operation may be retried locally with backoff.
    ///
    /// Validation, authorization and capacity errors are never retried.
    pub fn is_retriable(&self) -> bool {
        matches!(self, ErrorKind::TransientIo)
    }
}
