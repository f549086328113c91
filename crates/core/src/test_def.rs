// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-authored tests and scheduled job bundles.

use crate::location::Location;
use crate::queues::ExecKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of user-authored test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    Browser,
    Api,
    Performance,
    Synthetic,
}

crate::simple_display! {
    TestType {
        Browser => "browser",
        Api => "api",
        Performance => "performance",
        Synthetic => "synthetic",
    }
}

impl TestType {
    pub fn parse(s: &str) -> Option<TestType> {
        match s {
            "browser" => Some(TestType::Browser),
            "api" => Some(TestType::Api),
            "performance" => Some(TestType::Performance),
            "synthetic" => Some(TestType::Synthetic),
            _ => None,
        }
    }

    /// Which execution queue family serves this test type.
    ///
    /// Browser and API tests run under the Playwright runner; performance
    /// tests under k6; synthetic probes under the monitor runner.
    pub fn exec_kind(&self) -> ExecKind {
        match self {
            TestType::Browser | TestType::Api => ExecKind::Playwright,
            TestType::Performance => ExecKind::K6,
            TestType::Synthetic => ExecKind::Monitor,
        }
    }
}

/// Scheduled bundle kind (spec-visible subset of [`TestType`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Browser,
    Performance,
}

crate::simple_display! {
    JobType {
        Browser => "browser",
        Performance => "performance",
    }
}

impl JobType {
    pub fn exec_kind(&self) -> ExecKind {
        match self {
            JobType::Browser => ExecKind::Playwright,
            JobType::Performance => ExecKind::K6,
        }
    }
}

/// A user-authored script. Immutable from the worker's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDefinition {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub test_type: TestType,
    /// Base64-encoded script text; decoded once at admission.
    pub script: String,
    /// Default wall-clock budget override in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// A recurring or bundled set of runs, optionally cron-scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub job_type: JobType,
    /// Cron expression, or `None` for on-demand bundles.
    pub schedule: Option<String>,
    pub location: Location,
    pub test_ids: Vec<Uuid>,
}
