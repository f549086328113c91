// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenant plans and capacity limits.

use serde::{Deserialize, Serialize};

/// Billing standing of a tenant.
///
/// Non-`Active` tenants in cloud mode cannot submit runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    None,
}

crate::simple_display! {
    SubscriptionStatus {
        Active => "active",
        PastDue => "past_due",
        None => "none",
    }
}

impl SubscriptionStatus {
    pub fn parse(s: &str) -> Option<SubscriptionStatus> {
        match s {
            "active" => Some(SubscriptionStatus::Active),
            "past_due" => Some(SubscriptionStatus::PastDue),
            "none" => Some(SubscriptionStatus::None),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }
}

/// Per-plan capacity limits, resolved once per admission decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    /// Max runs in `running` at once.
    pub running_capacity: i64,
    /// Max runs parked in `queued` beyond the running slots.
    pub queued_capacity: i64,
    pub max_monitors: i64,
    /// Included execution minutes per billing window.
    pub included_minutes: i64,
    /// Included credit units per billing window (AI-backed operations).
    pub included_credits: i64,
    pub data_retention_days: i64,
}

impl PlanLimits {
    /// The free tier used when a tenant has no plan row (self-hosted mode).
    pub fn free_tier() -> Self {
        Self {
            running_capacity: 1,
            queued_capacity: 3,
            max_monitors: 5,
            included_minutes: 60,
            included_credits: 10,
            data_retention_days: 7,
        }
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
