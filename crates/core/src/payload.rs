// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue job payload handed from admission to a worker.

use crate::location::Location;
use crate::run::RunId;
use crate::test_def::TestType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::define_id! {
    /// Unique identifier for a substrate queue job.
    ///
    /// Distinct from the run id: a stalled run may be re-delivered under the
    /// same queue job id, while a retry submission creates a fresh one.
    pub struct QueueJobId("qj--");
}

/// Everything a worker needs to execute one run.
///
/// Variables and secrets are resolved once at admission time; the payload is
/// the only place they travel. `Debug` redacts them.
#[derive(Clone, Serialize, Deserialize)]
pub struct RunPayload {
    pub run_id: RunId,
    pub test_type: TestType,
    /// Decoded user script (no longer base64).
    pub script: String,
    pub location: Location,
    /// Plaintext project variables.
    #[serde(default)]
    pub vars: HashMap<String, String>,
    /// Decrypted secret variables. Never logged, never passed via argv.
    #[serde(default)]
    pub secrets: HashMap<String, String>,
    /// Per-test wall-clock override in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl RunPayload {
    pub fn new(run_id: RunId, test_type: TestType, script: impl Into<String>) -> Self {
        Self {
            run_id,
            test_type,
            script: script.into(),
            location: Location::Global,
            vars: HashMap::new(),
            secrets: HashMap::new(),
            timeout_ms: None,
        }
    }

    /// Combined environment for the child process: vars first, secrets
    /// override on key collision.
    pub fn child_env(&self) -> Vec<(String, String)> {
        let mut env: HashMap<String, String> = self.vars.clone();
        for (k, v) in &self.secrets {
            env.insert(k.clone(), v.clone());
        }
        let mut pairs: Vec<(String, String)> = env.into_iter().collect();
        pairs.sort();
        pairs
    }
}

impl std::fmt::Debug for RunPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunPayload")
            .field("run_id", &self.run_id)
            .field("test_type", &self.test_type)
            .field("script_len", &self.script.len())
            .field("location", &self.location)
            .field("vars", &self.vars.keys().collect::<Vec<_>>())
            .field("secrets", &format!("<{} redacted>", self.secrets.len()))
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
