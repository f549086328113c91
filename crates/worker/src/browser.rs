// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Browser-automation runner.
//!
//! Writes the decoded script plus a bootstrap harness into a scratch
//! directory and drives the Playwright binary as a child process. The
//! harness configures a JSON reporter, screenshots, and trace capture so
//! every run leaves artifacts behind.

use crate::runner::{collect_artifacts, ArtifactFile, Runner, RunnerResult};
use crate::supervise::{supervise, ChildSpec, SuperviseEnd};
use crate::WorkerError;
use async_trait::async_trait;
use sc_core::{RunPayload, RunStatus};
use sc_queue::CancelPlane;
use std::time::Duration;

/// Launch retry delays (spec: up to 3 retries at 1s, 2s, 4s).
const LAUNCH_RETRY_DELAYS: [Duration; 3] =
    [Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)];

const MAX_ARTIFACT_FILES: usize = 50;

pub struct BrowserRunner {
    bin: String,
    default_timeout: Duration,
    kill_grace: Duration,
    cancel_poll: Duration,
}

impl BrowserRunner {
    pub fn new(
        bin: String,
        default_timeout: Duration,
        kill_grace: Duration,
        cancel_poll: Duration,
    ) -> Self {
        Self { bin, default_timeout, kill_grace, cancel_poll }
    }

    fn write_harness(&self, dir: &std::path::Path, script: &str) -> std::io::Result<()> {
        std::fs::write(dir.join("test.spec.js"), script)?;
        // Reporter + artifact settings live in the harness so user scripts
        // cannot disable capture.
        std::fs::write(
            dir.join("playwright.config.js"),
            r#"module.exports = {
  testDir: '.',
  outputDir: 'artifacts',
  reporter: [['json', { outputFile: 'results.json' }], ['list']],
  use: {
    headless: true,
    screenshot: 'on',
    trace: 'retain-on-failure',
  },
};
"#,
        )?;
        Ok(())
    }

    fn spec_for(&self, dir: &std::path::Path, payload: &RunPayload) -> ChildSpec {
        let timeout = payload
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_timeout);
        let mut spec = ChildSpec::new(&self.bin, dir.to_path_buf())
            .arg("test")
            .arg("test.spec.js")
            .arg("--config")
            .arg("playwright.config.js")
            .env_pairs(payload.child_env())
            .timeout(timeout);
        spec.kill_grace = self.kill_grace;
        spec.cancel_poll = self.cancel_poll;
        // Browsers may be pre-provisioned outside the worker's own cache.
        if let Ok(browsers) = std::env::var("PLAYWRIGHT_BROWSERS_PATH") {
            spec.env.push(("PLAYWRIGHT_BROWSERS_PATH".to_string(), browsers));
        }
        spec
    }

    /// Playwright reports launch problems on stderr before any test ran;
    /// those are worth a fresh attempt, test failures are not.
    fn is_launch_failure(end: &SuperviseEnd) -> bool {
        match end {
            SuperviseEnd::Exited { exit_code, stderr, .. } if *exit_code != 0 => {
                stderr.contains("browserType.launch")
                    || stderr.contains("Failed to launch")
                    || stderr.contains("Executable doesn't exist")
            }
            _ => false,
        }
    }

    fn finish(&self, scratch: tempfile::TempDir, end: SuperviseEnd) -> RunnerResult {
        let elapsed = end.elapsed();
        match end {
            SuperviseEnd::Cancelled { .. } => {
                RunnerResult::new(RunStatus::Cancelled, elapsed).with_scratch(scratch)
            }
            SuperviseEnd::TimedOut { stdout, stderr, .. } => {
                let mut result = RunnerResult::new(RunStatus::TimedOut, elapsed);
                result.error = Some(format!("wall-clock timeout exceeded\n{stderr}"));
                result.artifacts = self.gather(&scratch, &stdout);
                result.with_scratch(scratch)
            }
            SuperviseEnd::Exited { exit_code, stdout, stderr, .. } => {
                let summary: Option<serde_json::Value> =
                    std::fs::read_to_string(scratch.path().join("results.json"))
                        .ok()
                        .and_then(|raw| serde_json::from_str(&raw).ok());
                let status = if exit_code == 0 {
                    RunStatus::Passed
                } else if summary.is_some() {
                    // The reporter ran: tests executed and some failed.
                    RunStatus::Failed
                } else {
                    RunStatus::Error
                };
                let mut result = RunnerResult::new(status, elapsed);
                result.exit_code = Some(exit_code);
                result.summary = summary;
                if status != RunStatus::Passed {
                    result.error = Some(if stderr.is_empty() { stdout.clone() } else { stderr });
                }
                result.artifacts = self.gather(&scratch, &stdout);
                result.with_scratch(scratch)
            }
        }
    }

    /// results.json + screenshots/traces + captured console output.
    fn gather(&self, scratch: &tempfile::TempDir, stdout: &str) -> Vec<ArtifactFile> {
        let console_path = scratch.path().join("console.log");
        let console_written = std::fs::write(&console_path, stdout).is_ok();
        let mut files = collect_artifacts(scratch.path(), MAX_ARTIFACT_FILES);
        if console_written
            && !files.iter().any(|f| f.filename == "console.log")
            && files.len() < MAX_ARTIFACT_FILES
        {
            files.push(ArtifactFile { filename: "console.log".to_string(), path: console_path });
        }
        files
    }
}

#[async_trait]
impl Runner for BrowserRunner {
    async fn execute(
        &self,
        payload: &RunPayload,
        cancel: &dyn CancelPlane,
    ) -> Result<RunnerResult, WorkerError> {
        let mut attempt = 0usize;
        loop {
            let scratch = tempfile::tempdir()?;
            self.write_harness(scratch.path(), &payload.script)?;
            let spec = self.spec_for(scratch.path(), payload);
            let end = supervise(spec, payload.run_id, cancel).await?;

            if Self::is_launch_failure(&end) && attempt < LAUNCH_RETRY_DELAYS.len() {
                let delay = LAUNCH_RETRY_DELAYS[attempt];
                attempt += 1;
                tracing::warn!(
                    run_id = %payload.run_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "browser launch failed, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }
            return Ok(self.finish(scratch, end));
        }
    }
}

#[cfg(test)]
#[path = "browser_tests.rs"]
mod tests;
