// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sc_queue::{EnqueueOpts, MemorySubstrate};
use serde_json::json;

#[tokio::test]
async fn pinned_location_routes_to_its_region_queue() {
    let substrate = MemorySubstrate::new();
    let router = RegionRouter::new(true);
    let queue = router
        .enqueue_queue(&substrate, ExecKind::Playwright, Location::EuCentral)
        .await
        .unwrap();
    assert_eq!(queue.to_string(), "playwright-exec-eu-central");
}

#[tokio::test]
async fn global_routes_to_lowest_load_region() {
    let substrate = MemorySubstrate::new();
    // Two jobs waiting in us-east, one in eu-central, none in asia-pacific.
    for _ in 0..2 {
        substrate
            .enqueue("k6-exec-us-east", &json!({}), EnqueueOpts::default())
            .await
            .unwrap();
    }
    substrate.enqueue("k6-exec-eu-central", &json!({}), EnqueueOpts::default()).await.unwrap();

    let router = RegionRouter::new(true);
    let queue =
        router.enqueue_queue(&substrate, ExecKind::K6, Location::Global).await.unwrap();
    assert_eq!(queue.to_string(), "k6-exec-asia-pacific");
}

#[tokio::test]
async fn global_ties_break_deterministically() {
    let substrate = MemorySubstrate::new();
    let router = RegionRouter::new(true);
    let queue = router
        .enqueue_queue(&substrate, ExecKind::Monitor, Location::Global)
        .await
        .unwrap();
    // All empty; first region wins.
    assert_eq!(queue.to_string(), "monitor-exec-us-east");
}

#[test]
fn pinned_worker_consumes_one_queue_when_filtering() {
    let router = RegionRouter::new(true);
    let queues = router.worker_queues(ExecKind::Playwright, Location::UsEast);
    assert_eq!(queues, vec!["playwright-exec-us-east".to_string()]);
}

#[test]
fn mvp_mode_worker_consumes_all_regions() {
    let router = RegionRouter::new(false);
    let queues = router.worker_queues(ExecKind::Playwright, Location::UsEast);
    assert_eq!(queues.len(), Location::REGIONS.len());
    assert_eq!(queues[0], "playwright-exec-us-east", "own region first");
}

#[test]
fn global_worker_consumes_all_regions_even_when_filtering() {
    let router = RegionRouter::new(true);
    let queues = router.worker_queues(ExecKind::K6, Location::Global);
    assert_eq!(queues.len(), Location::REGIONS.len());
}
