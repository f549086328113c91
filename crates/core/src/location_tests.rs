// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    us_east = { "us-east", Location::UsEast },
    eu_central = { "eu-central", Location::EuCentral },
    asia_pacific = { "asia-pacific", Location::AsiaPacific },
    global = { "global", Location::Global },
)]
fn parse_known(input: &str, expected: Location) {
    assert_eq!(Location::parse(input), Some(expected));
}

#[parameterized(
    empty = { "" },
    typo = { "us-west" },
    uppercase = { "US-EAST" },
    garbage = { "moon-base" },
)]
fn unknown_normalizes_to_global(input: &str) {
    assert_eq!(Location::parse(input), None);
    assert_eq!(Location::normalize(input), Location::Global);
}

#[test]
fn normalize_keeps_known_values() {
    assert_eq!(Location::normalize("eu-central"), Location::EuCentral);
}

#[test]
fn failover_starts_with_requested_region() {
    let order = Location::EuCentral.failover_order();
    assert_eq!(order[0], Location::EuCentral);
    assert_eq!(order.len(), 3);
    assert!(!order.contains(&Location::Global));
}

#[test]
fn global_failover_covers_all_regions() {
    let order = Location::Global.failover_order();
    assert_eq!(order.len(), Location::REGIONS.len());
    for region in Location::REGIONS {
        assert!(order.contains(&region));
    }
}

#[test]
fn serde_uses_kebab_case() {
    assert_eq!(serde_json::to_string(&Location::AsiaPacific).unwrap(), "\"asia-pacific\"");
    let parsed: Location = serde_json::from_str("\"us-east\"").unwrap();
    assert_eq!(parsed, Location::UsEast);
}
