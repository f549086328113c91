// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sc-admission: Submission validation, capacity admission and region
//! routing.
//!
//! The controller is the only path from "API request" to "queued run": it
//! checks the tenant's standing, resolves plan limits, counts active runs
//! against caps, validates the script, and then creates the run row and the
//! queue job as one unit of work (enqueue failure rolls the row to `error`).

pub mod controller;
pub mod router;
pub mod validate;

use sc_core::{ErrorKind, RunId, RunStatus};
use thiserror::Error;

pub use controller::{AdmissionController, SubmitOutcome, SubmitRequest};
pub use router::RegionRouter;
pub use validate::{validate_load_test_script, ScriptIssue};

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("subscription required")]
    SubscriptionRequired,
    #[error("capacity exceeded: {running} running (cap {running_capacity}), {queued} queued (cap {queued_capacity})")]
    CapacityExceeded {
        running: i64,
        running_capacity: i64,
        queued: i64,
        queued_capacity: i64,
    },
    #[error("credits exhausted: {used}/{limit}")]
    CreditsExhausted { used: i64, limit: i64 },
    #[error("validation failed on {field}: {message}")]
    Validation { field: &'static str, message: String },
    #[error("not allowed: {0}")]
    Forbidden(String),
    #[error("enqueue failed, run {run_id} marked error")]
    EnqueueFailed { run_id: RunId },
    #[error("store error: {0}")]
    Store(#[from] sc_store::StoreError),
    #[error("usage error: {0}")]
    Usage(#[from] sc_usage::UsageError),
}

impl AdmissionError {
    /// Taxonomy kind for boundary mapping and log tags.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdmissionError::SubscriptionRequired => ErrorKind::Subscription,
            AdmissionError::CapacityExceeded { .. } => ErrorKind::Capacity,
            AdmissionError::CreditsExhausted { .. } => ErrorKind::Capacity,
            AdmissionError::Validation { .. } => ErrorKind::Validation,
            AdmissionError::Forbidden(_) => ErrorKind::Authorization,
            AdmissionError::EnqueueFailed { .. } => ErrorKind::Internal,
            AdmissionError::Store(e) if e.is_transient() => ErrorKind::TransientIo,
            AdmissionError::Store(_) => ErrorKind::Internal,
            AdmissionError::Usage(_) => ErrorKind::Internal,
        }
    }
}

/// Desired target after admission. The actual `running` transition is
/// always performed by the leasing worker; this only reports whether a
/// running slot was free at admission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmittedAs {
    Queued,
    /// A running slot was free; the worker will pick this up immediately.
    RunnableNow,
}

impl AdmittedAs {
    pub fn status(&self) -> RunStatus {
        RunStatus::Queued
    }
}
