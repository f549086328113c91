// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Load-test runner.
//!
//! Drives the k6 binary with a structured summary export and the web
//! dashboard HTML export. Simultaneous in-flight load tests per worker are
//! capped by `K6_MAX_CONCURRENCY`.

use crate::runner::{ArtifactFile, Runner, RunnerResult};
use crate::supervise::{supervise, ChildSpec, SuperviseEnd};
use crate::WorkerError;
use async_trait::async_trait;
use sc_core::{RunPayload, RunStatus};
use sc_queue::CancelPlane;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub struct LoadTestRunner {
    bin: String,
    default_timeout: Duration,
    kill_grace: Duration,
    cancel_poll: Duration,
    slots: Arc<Semaphore>,
}

impl LoadTestRunner {
    pub fn new(
        bin: String,
        max_concurrency: usize,
        default_timeout: Duration,
        kill_grace: Duration,
        cancel_poll: Duration,
    ) -> Self {
        Self {
            bin,
            default_timeout,
            kill_grace,
            cancel_poll,
            slots: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    /// In-flight slots still free (test inspection).
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }
}

#[async_trait]
impl Runner for LoadTestRunner {
    async fn execute(
        &self,
        payload: &RunPayload,
        cancel: &dyn CancelPlane,
    ) -> Result<RunnerResult, WorkerError> {
        // Queue behind the concurrency cap. Cancellation still applies
        // while waiting (checked first thing in supervise).
        let _permit = self
            .slots
            .acquire()
            .await
            .map_err(|_| WorkerError::Spawn("load-test slots closed".to_string()))?;

        let scratch = tempfile::tempdir()?;
        std::fs::write(scratch.path().join("script.js"), &payload.script)?;

        let timeout = payload
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_timeout);
        let mut spec = ChildSpec::new(&self.bin, scratch.path().to_path_buf())
            .arg("run")
            .arg("script.js")
            .arg("--summary-export")
            .arg("summary.json")
            .env_pairs(payload.child_env())
            .timeout(timeout);
        spec.kill_grace = self.kill_grace;
        spec.cancel_poll = self.cancel_poll;
        spec.env.push(("K6_WEB_DASHBOARD".to_string(), "true".to_string()));
        spec.env.push(("K6_WEB_DASHBOARD_EXPORT".to_string(), "dashboard.html".to_string()));

        let end = supervise(spec, payload.run_id, cancel).await?;
        let elapsed = end.elapsed();
        let result = match end {
            SuperviseEnd::Cancelled { .. } => RunnerResult::new(RunStatus::Cancelled, elapsed),
            SuperviseEnd::TimedOut { stderr, .. } => {
                let mut result = RunnerResult::new(RunStatus::TimedOut, elapsed);
                result.error = Some(format!("wall-clock timeout exceeded\n{stderr}"));
                result
            }
            SuperviseEnd::Exited { exit_code, stdout, stderr, .. } => {
                let summary: Option<serde_json::Value> =
                    std::fs::read_to_string(scratch.path().join("summary.json"))
                        .ok()
                        .and_then(|raw| serde_json::from_str(&raw).ok());
                // k6 exits non-zero when thresholds are crossed; with a
                // summary in hand that is a failed test, not an error.
                let status = if exit_code == 0 {
                    RunStatus::Passed
                } else if summary.is_some() {
                    RunStatus::Failed
                } else {
                    RunStatus::Error
                };
                let mut result = RunnerResult::new(status, elapsed);
                result.exit_code = Some(exit_code);
                result.summary = summary;
                if status != RunStatus::Passed {
                    result.error = Some(if stderr.is_empty() { stdout } else { stderr });
                }
                result
            }
        };

        let mut result = result;
        result.artifacts = gather(scratch.path());
        Ok(result.with_scratch(scratch))
    }
}

fn gather(dir: &std::path::Path) -> Vec<ArtifactFile> {
    ["summary.json", "dashboard.html"]
        .iter()
        .filter_map(|name| {
            let path = dir.join(name);
            path.exists()
                .then(|| ArtifactFile { filename: (*name).to_string(), path })
        })
        .collect()
}

#[cfg(test)]
#[path = "loadtest_tests.rs"]
mod tests;
