// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stalled-job reclaim: at-least-once delivery, exactly one run row.

use super::harness::{probe_request, serve_status, Backbone};
use sc_core::{FakeClock, RunPatch, RunStatus, WorkerId};
use sc_queue::{MemorySubstrate, Substrate as _};
use sc_store::Store as _;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn stalled_delivery_is_reclaimed_and_the_second_attempt_settles() {
    // A clock we control, so visibility expiry does not need wall time.
    let clock = FakeClock::new();
    let substrate = Arc::new(MemorySubstrate::with_clock(clock.clone()));
    let backbone = Backbone::new();
    let url = serve_status("200 OK").await;

    // Submit through admission against the clocked substrate.
    let admission = sc_admission::AdmissionController::new(
        Arc::clone(&backbone.store),
        Arc::clone(&substrate),
        Arc::new(sc_usage::Ledger::new(
            sc_usage::MemoryCounter::new(),
            Arc::clone(&backbone.store),
        )),
        sc_admission::RegionRouter::new(true),
        false,
    );
    let outcome = admission.submit(probe_request(&backbone, &url)).await.expect("admit");

    // First delivery: the worker leases, transitions to running, crashes.
    let crashed_worker = WorkerId::new();
    let first = substrate
        .lease(
            &["monitor-exec-us-east".to_string()],
            &crashed_worker,
            Duration::from_secs(60),
        )
        .await
        .expect("lease")
        .expect("job");
    assert_eq!(first.attempt, 1);
    backbone
        .store
        .transition_run(outcome.run.id, RunStatus::Queued, RunStatus::Running, RunPatch::default())
        .await
        .expect("running");

    // Visibility expires; the reclaimer puts the job back.
    clock.advance(Duration::from_secs(61));
    assert_eq!(substrate.reclaim_stalled("monitor-exec-us-east").await.expect("reclaim"), 1);

    // Second delivery carries attempt 2 for the same queue job.
    let second = substrate
        .lease(
            &["monitor-exec-us-east".to_string()],
            &WorkerId::new(),
            Duration::from_secs(60),
        )
        .await
        .expect("lease")
        .expect("redelivery");
    assert_eq!(second.queue_job_id, first.queue_job_id);
    assert_eq!(second.attempt, 2);

    // The second worker finishes: terminal write is conditional, and the
    // run is already `running`, which is exactly the redelivery shape.
    backbone
        .store
        .transition_run(outcome.run.id, RunStatus::Running, RunStatus::Passed, RunPatch::default())
        .await
        .expect("settle");
    substrate
        .ack(&second, Some(serde_json::json!({"success": true})))
        .await
        .expect("ack");

    // One run row, terminal passed; the dead first delivery acking later
    // changes nothing.
    substrate.ack(&first, None).await.expect("late ack is a no-op");
    let settled = backbone.store.run_snapshot(outcome.run.id).expect("run");
    assert_eq!(settled.status, RunStatus::Passed);
    assert_eq!(
        backbone
            .store
            .count_runs(backbone.project_id, &[RunStatus::Passed])
            .await
            .expect("count"),
        1,
        "no duplicate rows from redelivery"
    );
}
