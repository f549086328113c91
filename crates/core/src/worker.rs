// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker identifier.

crate::define_id! {
    /// Unique identifier for a worker process.
    ///
    /// Generated at startup; carried in lease calls so stalled jobs can be
    /// attributed to the worker that lost them.
    pub struct WorkerId("wkr-");
}
