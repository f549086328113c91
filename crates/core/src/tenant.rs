// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenants (organizations) and projects.

use crate::plan::SubscriptionStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant. Billing standing gates submissions in cloud mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    /// `None` for unpaid tenants.
    pub plan_id: Option<Uuid>,
    pub subscription_status: SubscriptionStatus,
}

/// A project. Every runtime-scoped entity carries both `project_id` and
/// `tenant_id`, and both must match on access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Unique within the tenant.
    pub slug: String,
}
