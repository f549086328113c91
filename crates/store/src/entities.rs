// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store-side request/response records.

use chrono::{DateTime, Utc};
use sc_core::{Location, RunMetadata, Trigger};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Input to [`crate::Store::create_run`].
#[derive(Debug, Clone)]
pub struct NewRun {
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub job_id: Option<Uuid>,
    pub trigger: Trigger,
    pub location: Location,
    pub metadata: RunMetadata,
}

/// Resolved project variables, split by sensitivity.
///
/// Ephemeral: passed into the worker payload and dropped. `Debug` redacts
/// the secret values.
#[derive(Clone, Default)]
pub struct ResolvedVariables {
    pub vars: HashMap<String, String>,
    pub secrets: HashMap<String, String>,
}

impl std::fmt::Debug for ResolvedVariables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedVariables")
            .field("vars", &self.vars.keys().collect::<Vec<_>>())
            .field("secrets", &format!("<{} redacted>", self.secrets.len()))
            .finish()
    }
}

/// Usage event kinds the ledger records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    ExecutionMinutes,
    AiCredits,
}

sc_core::simple_display! {
    UsageKind {
        ExecutionMinutes => "execution_minutes",
        AiCredits => "ai_credits",
    }
}

impl UsageKind {
    pub fn parse(s: &str) -> Option<UsageKind> {
        match s {
            "execution_minutes" => Some(UsageKind::ExecutionMinutes),
            "ai_credits" => Some(UsageKind::AiCredits),
            _ => None,
        }
    }
}

/// Append-only usage row.
#[derive(Debug, Clone)]
pub struct UsageEvent {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Billing window, `YYYYMM`.
    pub window_id: String,
    pub kind: UsageKind,
    pub units: i64,
    /// Dedupe scope; `None` for non-run-scoped consumption.
    pub run_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub synced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewUsageEvent {
    pub tenant_id: Uuid,
    pub window_id: String,
    pub kind: UsageKind,
    pub units: i64,
    pub run_id: Option<Uuid>,
}

/// Resolved API token identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    pub tenant_id: Uuid,
    pub project_id: Uuid,
}
