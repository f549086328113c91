// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run identifier and lifecycle state machine.

use crate::location::Location;
use crate::metadata::RunMetadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a run.
///
/// UUIDv7 so that ids sort by creation time — FIFO position queries and
/// paginated listings rely on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-ordered id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RunId {
    fn from(u: Uuid) -> Self {
        Self(u)
    }
}

/// Lifecycle status of a run.
///
/// Transitions are strictly forward:
///
/// ```text
/// queued ─lease→ running
/// running ─pass→ passed      (terminal)
/// running ─fail→ failed      (terminal)
/// running ─err→  error       (terminal)
/// running ─timeout→ timed_out (terminal)
/// queued|running ─cancel→ cancelled (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Passed,
    Failed,
    Error,
    Cancelled,
    TimedOut,
}

crate::simple_display! {
    RunStatus {
        Queued => "queued",
        Running => "running",
        Passed => "passed",
        Failed => "failed",
        Error => "error",
        Cancelled => "cancelled",
        TimedOut => "timed_out",
    }
}

impl RunStatus {
    /// All statuses a run can never leave.
    pub const TERMINAL: [RunStatus; 5] = [
        RunStatus::Passed,
        RunStatus::Failed,
        RunStatus::Error,
        RunStatus::Cancelled,
        RunStatus::TimedOut,
    ];

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Queued | RunStatus::Running)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    ///
    /// Terminal states permit nothing; `queued` permits `running` and
    /// `cancelled`; `running` permits every terminal state.
    pub fn allows_transition_to(&self, next: RunStatus) -> bool {
        match self {
            RunStatus::Queued => matches!(next, RunStatus::Running | RunStatus::Cancelled),
            RunStatus::Running => next.is_terminal(),
            _ => false,
        }
    }

    /// Monotonic rank used by the event hub to drop status regressions.
    pub fn rank(&self) -> u8 {
        match self {
            RunStatus::Queued => 0,
            RunStatus::Running => 1,
            _ => 2,
        }
    }

    pub fn parse(s: &str) -> Option<RunStatus> {
        match s {
            "queued" => Some(RunStatus::Queued),
            "running" => Some(RunStatus::Running),
            "passed" => Some(RunStatus::Passed),
            "failed" => Some(RunStatus::Failed),
            "error" => Some(RunStatus::Error),
            "cancelled" => Some(RunStatus::Cancelled),
            "timed_out" => Some(RunStatus::TimedOut),
            _ => None,
        }
    }
}

/// What caused a run to be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Manual,
    Scheduled,
    Api,
    Retry,
}

crate::simple_display! {
    Trigger {
        Manual => "manual",
        Scheduled => "scheduled",
        Api => "api",
        Retry => "retry",
    }
}

impl Trigger {
    pub fn parse(s: &str) -> Option<Trigger> {
        match s {
            "manual" => Some(Trigger::Manual),
            "scheduled" => Some(Trigger::Scheduled),
            "api" => Some(Trigger::Api),
            "retry" => Some(Trigger::Retry),
            _ => None,
        }
    }
}

/// A persisted execution record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    /// Scheduled bundle this run belongs to, if any.
    pub job_id: Option<Uuid>,
    pub status: RunStatus,
    pub trigger: Trigger,
    pub location: Location,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    /// Sanitized failure detail; never contains secret values.
    pub error_details: Option<String>,
    /// Object-store keys of uploaded artifacts.
    pub artifact_paths: Vec<String>,
    pub metadata: RunMetadata,
}

impl Run {
    /// Invariant check: terminal runs carry a completion timestamp no
    /// earlier than their start.
    pub fn is_consistent(&self) -> bool {
        if self.status.is_terminal() {
            match self.completed_at {
                Some(done) => done >= self.started_at,
                None => false,
            }
        } else {
            self.completed_at.is_none()
        }
    }
}

/// Fields a terminal transition may patch onto the run row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunPatch {
    pub error_details: Option<String>,
    pub artifact_paths: Option<Vec<String>>,
    pub duration_ms: Option<i64>,
}

crate::builder! {
    pub struct RunBuilder => Run {
        set {
            status: RunStatus = RunStatus::Queued,
            trigger: Trigger = Trigger::Manual,
            location: Location = Location::UsEast,
            artifact_paths: Vec<String> = Vec::new(),
            metadata: RunMetadata = RunMetadata::default(),
        }
        option {
            job_id: uuid::Uuid = None,
            completed_at: chrono::DateTime<chrono::Utc> = None,
            duration_ms: i64 = None,
            error_details: String = None,
        }
        computed {
            id: RunId = RunId::generate(),
            tenant_id: uuid::Uuid = uuid::Uuid::new_v4(),
            project_id: uuid::Uuid = uuid::Uuid::new_v4(),
            started_at: chrono::DateTime<chrono::Utc> = chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
