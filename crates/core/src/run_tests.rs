// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::strategies::*;
use proptest::prelude::*;
use yare::parameterized;

#[test]
fn run_id_is_time_ordered() {
    let a = RunId::generate();
    let b = RunId::generate();
    assert!(a <= b, "UUIDv7 ids must sort by creation time");
}

#[test]
fn run_id_serde_is_transparent() {
    let id = RunId::generate();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{id}\""));
    let parsed: RunId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[parameterized(
    queued = { RunStatus::Queued, false },
    running = { RunStatus::Running, false },
    passed = { RunStatus::Passed, true },
    failed = { RunStatus::Failed, true },
    error = { RunStatus::Error, true },
    cancelled = { RunStatus::Cancelled, true },
    timed_out = { RunStatus::TimedOut, true },
)]
fn terminal_statuses(status: RunStatus, terminal: bool) {
    assert_eq!(status.is_terminal(), terminal);
}

#[test]
fn queued_allows_lease_and_cancel_only() {
    let q = RunStatus::Queued;
    assert!(q.allows_transition_to(RunStatus::Running));
    assert!(q.allows_transition_to(RunStatus::Cancelled));
    assert!(!q.allows_transition_to(RunStatus::Passed));
    assert!(!q.allows_transition_to(RunStatus::Failed));
    assert!(!q.allows_transition_to(RunStatus::TimedOut));
    assert!(!q.allows_transition_to(RunStatus::Queued));
}

#[test]
fn running_allows_every_terminal() {
    let r = RunStatus::Running;
    for terminal in RunStatus::TERMINAL {
        assert!(r.allows_transition_to(terminal), "running -> {terminal} must be allowed");
    }
    assert!(!r.allows_transition_to(RunStatus::Queued));
    assert!(!r.allows_transition_to(RunStatus::Running));
}

proptest! {
    /// No transition out of a terminal state is ever permitted.
    #[test]
    fn terminal_states_are_absorbing(from in arb_terminal_status(), to in arb_run_status()) {
        prop_assert!(!from.allows_transition_to(to));
    }

    /// Ranks are monotone along any permitted transition.
    #[test]
    fn rank_never_decreases(from in arb_run_status(), to in arb_run_status()) {
        if from.allows_transition_to(to) {
            prop_assert!(to.rank() >= from.rank());
        }
    }

    /// Wire names round-trip through parse.
    #[test]
    fn status_display_parse_roundtrip(status in arb_run_status()) {
        prop_assert_eq!(RunStatus::parse(&status.to_string()), Some(status));
    }
}

#[test]
fn status_serde_uses_snake_case() {
    let json = serde_json::to_string(&RunStatus::TimedOut).unwrap();
    assert_eq!(json, "\"timed_out\"");
}

#[test]
fn trigger_roundtrip() {
    for t in [Trigger::Manual, Trigger::Scheduled, Trigger::Api, Trigger::Retry] {
        assert_eq!(Trigger::parse(&t.to_string()), Some(t));
    }
    assert_eq!(Trigger::parse("webhook"), None);
}

#[test]
fn consistency_requires_completed_at_for_terminal() {
    let run = Run::builder().status(RunStatus::Passed).build();
    assert!(!run.is_consistent(), "terminal without completed_at is inconsistent");

    let run = Run::builder()
        .status(RunStatus::Passed)
        .completed_at(chrono::Utc::now())
        .build();
    assert!(run.is_consistent());
}

#[test]
fn consistency_rejects_completed_before_started() {
    let run = Run::builder()
        .status(RunStatus::Failed)
        .completed_at(chrono::Utc::now() - chrono::Duration::hours(1))
        .build();
    assert!(!run.is_consistent());
}

#[test]
fn active_run_must_not_have_completed_at() {
    let run = Run::builder().status(RunStatus::Running).completed_at(chrono::Utc::now()).build();
    assert!(!run.is_consistent());
}
