// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capacity admission under plan limits.

use super::harness::{probe_request, Backbone};
use sc_admission::AdmissionError;
use sc_core::{PlanLimits, RunPatch, RunStatus};
use sc_store::Store as _;

fn limits(running: i64, queued: i64) -> PlanLimits {
    PlanLimits { running_capacity: running, queued_capacity: queued, ..PlanLimits::free_tier() }
}

#[tokio::test]
async fn both_pools_full_is_a_capacity_rejection() {
    let backbone = Backbone::new();
    backbone.store.set_plan_limits(backbone.tenant_id, limits(3, 0));

    // Three running, zero queued slots.
    for _ in 0..3 {
        let outcome = backbone
            .admission
            .submit(probe_request(&backbone, "https://example.com"))
            .await
            .expect("admit");
        backbone
            .store
            .transition_run(outcome.run.id, RunStatus::Queued, RunStatus::Running, RunPatch::default())
            .await
            .expect("lease");
    }

    let err = backbone
        .admission
        .submit(probe_request(&backbone, "https://example.com"))
        .await
        .expect_err("must reject");
    assert!(matches!(err, AdmissionError::CapacityExceeded { .. }));
}

#[tokio::test]
async fn free_running_slot_admits_below_cap() {
    let backbone = Backbone::new();
    backbone.store.set_plan_limits(backbone.tenant_id, limits(3, 0));

    // Two running out of three: one slot is free.
    for _ in 0..2 {
        let outcome = backbone
            .admission
            .submit(probe_request(&backbone, "https://example.com"))
            .await
            .expect("admit");
        backbone
            .store
            .transition_run(outcome.run.id, RunStatus::Queued, RunStatus::Running, RunPatch::default())
            .await
            .expect("lease");
    }

    let outcome = backbone
        .admission
        .submit(probe_request(&backbone, "https://example.com"))
        .await
        .expect("one slot is free");
    assert_eq!(outcome.run.status, RunStatus::Queued);
}

#[tokio::test]
async fn fifo_positions_report_earlier_queued_runs() {
    let backbone = Backbone::new();
    backbone.store.set_plan_limits(backbone.tenant_id, limits(0, 10));

    let mut positions = Vec::new();
    for _ in 0..3 {
        let outcome = backbone
            .admission
            .submit(probe_request(&backbone, "https://example.com"))
            .await
            .expect("admit");
        positions.push(outcome.position);
    }
    assert_eq!(positions, vec![0, 1, 2]);
}
