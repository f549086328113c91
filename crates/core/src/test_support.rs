// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers and proptest strategies.

pub mod strategies {
    use crate::run::{RunStatus, Trigger};
    use crate::location::Location;
    use proptest::prelude::*;

    pub fn arb_run_status() -> impl Strategy<Value = RunStatus> {
        prop_oneof![
            Just(RunStatus::Queued),
            Just(RunStatus::Running),
            Just(RunStatus::Passed),
            Just(RunStatus::Failed),
            Just(RunStatus::Error),
            Just(RunStatus::Cancelled),
            Just(RunStatus::TimedOut),
        ]
    }

    pub fn arb_terminal_status() -> impl Strategy<Value = RunStatus> {
        prop_oneof![
            Just(RunStatus::Passed),
            Just(RunStatus::Failed),
            Just(RunStatus::Error),
            Just(RunStatus::Cancelled),
            Just(RunStatus::TimedOut),
        ]
    }

    pub fn arb_trigger() -> impl Strategy<Value = Trigger> {
        prop_oneof![
            Just(Trigger::Manual),
            Just(Trigger::Scheduled),
            Just(Trigger::Api),
            Just(Trigger::Retry),
        ]
    }

    pub fn arb_location() -> impl Strategy<Value = Location> {
        prop_oneof![
            Just(Location::UsEast),
            Just(Location::EuCentral),
            Just(Location::AsiaPacific),
            Just(Location::Global),
        ]
    }
}
