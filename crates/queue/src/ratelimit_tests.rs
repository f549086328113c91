// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sc_core::FakeClock;

const WINDOW: Duration = Duration::from_secs(60);

#[tokio::test]
async fn admits_up_to_the_limit() {
    let limiter = MemoryRateLimiter::new();
    for _ in 0..3 {
        assert!(limiter.check("tenant-a", 3, WINDOW).await.unwrap());
    }
    assert!(!limiter.check("tenant-a", 3, WINDOW).await.unwrap(), "fourth must be denied");
}

#[tokio::test]
async fn denied_requests_do_not_consume_the_window() {
    let clock = FakeClock::new();
    let limiter = MemoryRateLimiter::with_clock(clock.clone());
    assert!(limiter.check("t", 1, WINDOW).await.unwrap());
    for _ in 0..5 {
        assert!(!limiter.check("t", 1, WINDOW).await.unwrap());
    }
    // One window later the single admitted entry has expired; the denials
    // must not have extended it.
    clock.advance(WINDOW + Duration::from_secs(1));
    assert!(limiter.check("t", 1, WINDOW).await.unwrap());
}

#[tokio::test]
async fn the_window_slides() {
    let clock = FakeClock::new();
    let limiter = MemoryRateLimiter::with_clock(clock.clone());
    assert!(limiter.check("t", 2, WINDOW).await.unwrap());
    clock.advance(Duration::from_secs(40));
    assert!(limiter.check("t", 2, WINDOW).await.unwrap());
    assert!(!limiter.check("t", 2, WINDOW).await.unwrap());

    // The first entry (t=0) leaves the window at t=60; the second (t=40)
    // is still inside it.
    clock.advance(Duration::from_secs(25));
    assert!(limiter.check("t", 2, WINDOW).await.unwrap());
    assert!(!limiter.check("t", 2, WINDOW).await.unwrap());
}

#[tokio::test]
async fn scopes_are_independent() {
    let limiter = MemoryRateLimiter::new();
    assert!(limiter.check("tenant-a", 1, WINDOW).await.unwrap());
    assert!(!limiter.check("tenant-a", 1, WINDOW).await.unwrap());
    assert!(limiter.check("tenant-b", 1, WINDOW).await.unwrap());
}

#[tokio::test]
async fn zero_limit_denies_everything() {
    let limiter = MemoryRateLimiter::new();
    assert!(!limiter.check("t", 0, WINDOW).await.unwrap());
}
