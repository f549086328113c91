// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue job records and retry policy.

use sc_core::{QueueJobId, RunId, Trigger};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff: `base × 2^(attempt-1)`, capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backoff {
    pub base_ms: u64,
    pub cap_ms: u64,
}

impl Backoff {
    pub const DEFAULT: Backoff = Backoff { base_ms: 1_000, cap_ms: 60_000 };

    /// Delay before re-delivery of attempt `attempt + 1`.
    ///
    /// `attempt` is the 1-based attempt that just failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        let ms = self.base_ms.saturating_mul(1u64 << shift).min(self.cap_ms);
        Duration::from_millis(ms)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Options for [`crate::Substrate::enqueue`].
#[derive(Debug, Clone)]
pub struct EnqueueOpts {
    /// Deliver no earlier than this far in the future.
    pub delay: Option<Duration>,
    /// Total delivery attempts (≥ 1).
    pub attempts: u32,
    pub backoff: Backoff,
    /// Run this job executes, for lifecycle event correlation.
    pub run_id: Option<RunId>,
    pub trigger: Option<Trigger>,
}

impl Default for EnqueueOpts {
    fn default() -> Self {
        Self {
            delay: None,
            attempts: 1,
            backoff: Backoff::DEFAULT,
            run_id: None,
            trigger: None,
        }
    }
}

impl EnqueueOpts {
    pub fn with_run(run_id: RunId, trigger: Trigger) -> Self {
        Self { run_id: Some(run_id), trigger: Some(trigger), ..Self::default() }
    }

    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// A job handed to a worker by [`crate::Substrate::lease`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeasedJob {
    pub queue: String,
    pub queue_job_id: QueueJobId,
    pub payload: serde_json::Value,
    /// 1-based delivery attempt.
    pub attempt: u32,
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub run_id: Option<RunId>,
    pub trigger: Option<Trigger>,
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
