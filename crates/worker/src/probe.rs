// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Uptime probe runner.
//!
//! Monitors are bounded in-process HTTP checks, not child processes: one
//! GET with a hard timeout, status and latency recorded. The "script" for
//! a synthetic probe is either a bare URL or a small JSON config.

use crate::runner::{Runner, RunnerResult};
use crate::WorkerError;
use async_trait::async_trait;
use sc_core::{RunPayload, RunStatus};
use sc_queue::CancelPlane;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};

/// Probes never run longer than this, regardless of run timeout.
const MAX_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ProbeConfig {
    url: String,
    #[serde(default)]
    expected_status: Option<u16>,
}

impl ProbeConfig {
    /// Bare URLs are the common playground case.
    fn parse(script: &str) -> Result<ProbeConfig, WorkerError> {
        let trimmed = script.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Ok(ProbeConfig { url: trimmed.to_string(), expected_status: None });
        }
        serde_json::from_str(trimmed)
            .map_err(|e| WorkerError::Payload(format!("probe config: {e}")))
    }
}

pub struct MonitorRunner {
    client: reqwest::Client,
}

impl MonitorRunner {
    pub fn new() -> Result<Self, WorkerError> {
        let client = reqwest::Client::builder()
            .timeout(MAX_PROBE_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent("supercheck-monitor/1.0")
            .build()
            .map_err(|e| WorkerError::Spawn(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Runner for MonitorRunner {
    async fn execute(
        &self,
        payload: &RunPayload,
        cancel: &dyn CancelPlane,
    ) -> Result<RunnerResult, WorkerError> {
        if cancel.is_cancelled(payload.run_id).await? {
            return Ok(RunnerResult::new(RunStatus::Cancelled, Duration::ZERO));
        }
        let config = ProbeConfig::parse(&payload.script)?;
        let timeout = payload
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(MAX_PROBE_TIMEOUT)
            .min(MAX_PROBE_TIMEOUT);

        let started = Instant::now();
        let response =
            tokio::time::timeout(timeout, self.client.get(&config.url).send()).await;
        let latency = started.elapsed();

        let (status, summary, error) = match response {
            Ok(Ok(response)) => {
                let code = response.status().as_u16();
                let up = match config.expected_status {
                    Some(expected) => code == expected,
                    None => response.status().is_success() || response.status().is_redirection(),
                };
                let summary = json!({
                    "url": config.url,
                    "status_code": code,
                    "latency_ms": latency.as_millis() as u64,
                    "up": up,
                });
                let error = (!up).then(|| format!("unexpected status {code}"));
                (if up { RunStatus::Passed } else { RunStatus::Failed }, summary, error)
            }
            Ok(Err(e)) => (
                RunStatus::Failed,
                json!({"url": config.url, "up": false, "latency_ms": latency.as_millis() as u64}),
                Some(format!("request failed: {e}")),
            ),
            Err(_) => (
                RunStatus::Failed,
                json!({"url": config.url, "up": false, "timed_out": true}),
                Some(format!("probe exceeded {}ms", timeout.as_millis())),
            ),
        };

        let mut result = RunnerResult::new(status, latency);
        result.summary = Some(summary);
        result.error = error;
        Ok(result)
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
