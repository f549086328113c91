// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Geographic locations a run can be pinned to.

use serde::{Deserialize, Serialize};

/// Recognized execution regions.
///
/// `Global` means "any region" — the router picks the lowest-load queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Location {
    UsEast,
    EuCentral,
    AsiaPacific,
    Global,
}

crate::simple_display! {
    Location {
        UsEast => "us-east",
        EuCentral => "eu-central",
        AsiaPacific => "asia-pacific",
        Global => "global",
    }
}

impl Location {
    /// The concrete regions (everything except `Global`).
    pub const REGIONS: [Location; 3] =
        [Location::UsEast, Location::EuCentral, Location::AsiaPacific];

    pub fn parse(s: &str) -> Option<Location> {
        match s {
            "us-east" => Some(Location::UsEast),
            "eu-central" => Some(Location::EuCentral),
            "asia-pacific" => Some(Location::AsiaPacific),
            "global" => Some(Location::Global),
            _ => None,
        }
    }

    /// Boundary normalization: any unrecognized value becomes `Global`.
    ///
    /// Logs a warning so misconfigured callers are visible without
    /// failing their submissions.
    pub fn normalize(s: &str) -> Location {
        match Location::parse(s) {
            Some(loc) => loc,
            None => {
                tracing::warn!(location = %s, "unrecognized location, normalizing to global");
                Location::Global
            }
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Location::Global)
    }

    /// Failover ordering for dispatch: the requested region first, then the
    /// remaining regions in declaration order. `Global` yields all regions.
    pub fn failover_order(&self) -> Vec<Location> {
        match self {
            Location::Global => Self::REGIONS.to_vec(),
            pinned => {
                let mut order = vec![*pinned];
                order.extend(Self::REGIONS.iter().copied().filter(|r| r != pinned));
                order
            }
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Location::Global
    }
}

#[cfg(test)]
#[path = "location_tests.rs"]
mod tests;
