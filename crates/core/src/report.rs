// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Report rows — pointers to rendered result documents in object storage.

use crate::run::RunStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a report is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportEntity {
    Test,
    Run,
}

crate::simple_display! {
    ReportEntity {
        Test => "test",
        Run => "run",
    }
}

impl ReportEntity {
    pub fn parse(s: &str) -> Option<ReportEntity> {
        match s {
            "test" => Some(ReportEntity::Test),
            "run" => Some(ReportEntity::Run),
            _ => None,
        }
    }
}

/// A stored report reference. `status` mirrors the run's terminal status;
/// the test-scoped SSE endpoint cross-checks it against queue completions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub entity_type: ReportEntity,
    pub entity_id: Uuid,
    pub report_path: String,
    pub s3_url: String,
    pub status: RunStatus,
}
