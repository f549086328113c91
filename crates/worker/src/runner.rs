// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner contract.

use crate::WorkerError;
use async_trait::async_trait;
use sc_core::{RunPayload, RunStatus};
use sc_queue::CancelPlane;
use std::path::PathBuf;
use std::time::Duration;

/// A file produced by a run, still on local disk.
#[derive(Debug)]
pub struct ArtifactFile {
    pub filename: String,
    pub path: PathBuf,
}

/// What a runner hands back to the outcome reporter.
///
/// Artifact paths point into `scratch`; the reporter uploads them before
/// this value is dropped (dropping deletes the directory on every path).
pub struct RunnerResult {
    /// Terminal status this execution implies.
    pub status: RunStatus,
    pub exit_code: Option<i32>,
    /// Structured result document (Playwright results, k6 summary, probe
    /// measurement) when one was produced.
    pub summary: Option<serde_json::Value>,
    pub artifacts: Vec<ArtifactFile>,
    /// Raw failure detail; sanitized before it reaches the run row.
    pub error: Option<String>,
    pub elapsed: Duration,
    scratch: Option<tempfile::TempDir>,
}

impl RunnerResult {
    pub fn new(status: RunStatus, elapsed: Duration) -> Self {
        Self {
            status,
            exit_code: None,
            summary: None,
            artifacts: Vec::new(),
            error: None,
            elapsed,
            scratch: None,
        }
    }

    /// Attach the scratch dir so it outlives artifact upload.
    pub fn with_scratch(mut self, scratch: tempfile::TempDir) -> Self {
        self.scratch = Some(scratch);
        self
    }

    pub fn success(&self) -> bool {
        self.status == RunStatus::Passed
    }
}

impl std::fmt::Debug for RunnerResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerResult")
            .field("status", &self.status)
            .field("exit_code", &self.exit_code)
            .field("artifacts", &self.artifacts.len())
            .field("elapsed", &self.elapsed)
            .finish()
    }
}

/// One execution strategy (browser, load test, probe).
#[async_trait]
pub trait Runner: Send + Sync {
    async fn execute(
        &self,
        payload: &RunPayload,
        cancel: &dyn CancelPlane,
    ) -> Result<RunnerResult, WorkerError>;
}

/// Recursively collect artifact files under `dir` (bounded).
pub(crate) fn collect_artifacts(dir: &std::path::Path, max_files: usize) -> Vec<ArtifactFile> {
    const KEEP: [&str; 7] = ["png", "jpeg", "zip", "har", "json", "webm", "html"];
    let mut found = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&current) else { continue };
        for entry in entries.flatten() {
            if found.len() >= max_files {
                return found;
            }
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| KEEP.contains(&e))
                .unwrap_or(false)
            {
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "artifact".to_string());
                found.push(ArtifactFile { filename, path });
            }
        }
    }
    found
}
