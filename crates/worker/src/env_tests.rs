// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn k6_concurrency_defaults_to_three() {
    std::env::remove_var("K6_MAX_CONCURRENCY");
    assert_eq!(k6_max_concurrency(), 3);
}

#[test]
#[serial]
fn k6_concurrency_rejects_zero() {
    std::env::set_var("K6_MAX_CONCURRENCY", "0");
    assert_eq!(k6_max_concurrency(), 3);
    std::env::remove_var("K6_MAX_CONCURRENCY");
}

#[test]
#[serial]
fn k6_concurrency_reads_env() {
    std::env::set_var("K6_MAX_CONCURRENCY", "7");
    assert_eq!(k6_max_concurrency(), 7);
    std::env::remove_var("K6_MAX_CONCURRENCY");
}

#[test]
#[serial]
fn worker_location_normalizes_unknown_values() {
    std::env::set_var("WORKER_LOCATION", "us-west-9");
    assert_eq!(worker_location(), Location::Global);
    std::env::set_var("WORKER_LOCATION", "eu-central");
    assert_eq!(worker_location(), Location::EuCentral);
    std::env::remove_var("WORKER_LOCATION");
}

#[test]
fn visibility_exceeds_run_timeout() {
    let timeout = Duration::from_secs(600);
    assert!(lease_visibility(timeout) > timeout);
}
