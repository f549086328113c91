// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Region pinning: with filtering on, only the matching region's worker
//! ever touches a job.

use super::harness::{probe_request, serve_status, Backbone};
use sc_core::{Location, RunStatus};
use sc_queue::Substrate as _;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn only_the_pinned_region_processes_the_job() {
    let backbone = Backbone::new();
    let url = serve_status("200 OK").await;
    let outcome = backbone.admission.submit(probe_request(&backbone, &url)).await.expect("admit");

    // Wrong-region worker first: it must never lease the us-east job.
    let eu_pool = backbone.pool(Location::EuCentral);
    let eu_shutdown = CancellationToken::new();
    let eu_worker = tokio::spawn(Arc::clone(&eu_pool).run(eu_shutdown.clone()));
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(
        backbone.store.run_snapshot(outcome.run.id).expect("run").status,
        RunStatus::Queued,
        "a eu-central worker must ignore us-east work"
    );
    assert_eq!(backbone.substrate.active_count("monitor-exec-us-east"), 0);

    // The right-region worker drains it.
    let us_pool = backbone.pool(Location::UsEast);
    let us_shutdown = CancellationToken::new();
    let us_worker = tokio::spawn(Arc::clone(&us_pool).run(us_shutdown.clone()));
    let settled = backbone.wait_terminal(outcome.run.id).await;
    assert_eq!(settled.status, RunStatus::Passed);

    eu_shutdown.cancel();
    us_shutdown.cancel();
    eu_worker.await.expect("eu join");
    us_worker.await.expect("us join");
}

#[tokio::test]
async fn global_submissions_land_on_the_least_loaded_region() {
    let backbone = Backbone::new();
    let mut request = probe_request(&backbone, "https://example.com");
    request.location = Some("global".to_string());
    let outcome = backbone.admission.submit(request).await.expect("admit");
    assert_eq!(outcome.run.location, Location::Global);

    // All regions empty: the router picks deterministically, and exactly
    // one region queue holds the job.
    let mut depths = Vec::new();
    for region in ["us-east", "eu-central", "asia-pacific"] {
        depths.push(
            backbone
                .substrate
                .waiting_depth(&format!("monitor-exec-{region}"))
                .await
                .expect("depth"),
        );
    }
    assert_eq!(depths.iter().sum::<u64>(), 1);
}
