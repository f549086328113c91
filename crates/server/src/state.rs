// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared application state, wired once at startup.

use crate::audit::AuditLog;
use crate::hub::EventHub;
use sc_admission::AdmissionController;
use sc_queue::{CancelPlane, RateLimiter, Substrate};
use sc_store::Store;
use sc_usage::CreditLedger;
use std::sync::Arc;

/// One per app node. Cheap to clone into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub substrate: Arc<dyn Substrate>,
    pub cancel: Arc<dyn CancelPlane>,
    pub ledger: Arc<dyn CreditLedger>,
    pub admission: Arc<AdmissionController<dyn Store, dyn Substrate, dyn CreditLedger>>,
    pub hub: EventHub,
    pub audit: AuditLog,
    /// Absent in self-hosted minimal deployments.
    pub ratelimit: Option<Arc<dyn RateLimiter>>,
    pub config: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub self_hosted: bool,
    pub cron_secret: Option<String>,
    pub submit_rate_limit: u32,
}

#[allow(clippy::too_many_arguments)]
impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        substrate: Arc<dyn Substrate>,
        cancel: Arc<dyn CancelPlane>,
        ledger: Arc<dyn CreditLedger>,
        admission: Arc<AdmissionController<dyn Store, dyn Substrate, dyn CreditLedger>>,
        hub: EventHub,
        audit: AuditLog,
        ratelimit: Option<Arc<dyn RateLimiter>>,
        config: ServerConfig,
    ) -> Self {
        Self { store, substrate, cancel, ledger, admission, hub, audit, ratelimit, config }
    }
}
