// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sc-worker: Per-region worker pool.
//!
//! A worker registers with a unique id and a declared region, then loops:
//! lease → spawn → supervise → report outcome → ack/nack. Runners execute
//! in isolated child processes (browser automation, load tests) or bounded
//! in-process probes (uptime monitors).

pub mod browser;
pub mod cleanup;
pub mod env;
pub mod loadtest;
pub mod outcome;
pub mod pool;
pub mod probe;
pub mod runner;
pub mod sanitize;
pub mod supervise;

use thiserror::Error;

pub use pool::{WorkerConfig, WorkerPool};
pub use runner::{Runner, RunnerResult};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("queue error: {0}")]
    Queue(#[from] sc_queue::QueueError),
    #[error("store error: {0}")]
    Store(#[from] sc_store::StoreError),
    #[error("artifact error: {0}")]
    Artifact(#[from] sc_artifact::ArtifactError),
    #[error("usage error: {0}")]
    Usage(#[from] sc_usage::UsageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("payload invalid: {0}")]
    Payload(String),
}
