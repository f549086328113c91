// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Region router.
//!
//! Maps an execution kind plus a requested location onto region-scoped
//! queues. `global` goes to the lowest-load region. When location filtering
//! is off (MVP mode), workers consume every region's queue, so the choice
//! only affects which list a job waits in.

use sc_core::{ExecKind, Location, QueueName};
use sc_queue::{QueueError, Substrate};

#[derive(Debug, Clone, Copy)]
pub struct RegionRouter {
    /// Mirrors `ENABLE_LOCATION_FILTERING`.
    pub location_filtering: bool,
}

impl RegionRouter {
    pub fn new(location_filtering: bool) -> Self {
        Self { location_filtering }
    }

    /// The queue a new job should be enqueued into.
    pub async fn enqueue_queue<Q: Substrate + ?Sized>(
        &self,
        substrate: &Q,
        kind: ExecKind,
        location: Location,
    ) -> Result<QueueName, QueueError> {
        match location {
            Location::Global => self.lowest_load(substrate, kind).await,
            region => Ok(QueueName::exec(kind, region)),
        }
    }

    /// Queues a worker should consume, in failover order.
    ///
    /// With filtering on, a worker is pinned to exactly one region. With it
    /// off, one pool drains all regions (requested region first).
    pub fn worker_queues(&self, kind: ExecKind, region: Location) -> Vec<String> {
        if self.location_filtering && !region.is_global() {
            vec![QueueName::exec(kind, region).to_string()]
        } else {
            region
                .failover_order()
                .into_iter()
                .map(|r| QueueName::exec(kind, r).to_string())
                .collect()
        }
    }

    async fn lowest_load<Q: Substrate + ?Sized>(
        &self,
        substrate: &Q,
        kind: ExecKind,
    ) -> Result<QueueName, QueueError> {
        let mut best: Option<(u64, QueueName)> = None;
        for region in Location::REGIONS {
            let queue = QueueName::exec(kind, region);
            let depth = substrate.waiting_depth(&queue.to_string()).await?;
            let better = match &best {
                Some((best_depth, _)) => depth < *best_depth,
                None => true,
            };
            if better {
                best = Some((depth, queue));
            }
        }
        // REGIONS is non-empty, so best is always set; fall back anyway.
        Ok(best
            .map(|(_, queue)| queue)
            .unwrap_or(QueueName::exec(kind, Location::UsEast)))
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
