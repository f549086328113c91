// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store errors.

use sc_core::RunStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Conditional update found the row in a different state.
    ///
    /// Workers treat this as success-after-the-fact: the run is already
    /// terminal, the queue job still gets acked.
    #[error("state conflict: run is {current}, not {expected}")]
    StateConflict { expected: RunStatus, current: RunStatus },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("secret decryption failed for variable {0}")]
    SecretDecrypt(String),
    #[error("secrets key invalid: {0}")]
    SecretsKey(String),
    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Database(sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut))
    }
}
