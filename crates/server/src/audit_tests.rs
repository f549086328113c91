// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex;
use std::time::Duration;

struct Collect(Arc<Mutex<Vec<AuditEvent>>>);

#[async_trait]
impl AuditSink for Collect {
    async fn write(&self, event: AuditEvent) {
        self.0.lock().push(event);
    }
}

#[tokio::test]
async fn events_flow_to_the_sink() {
    let collected = Arc::new(Mutex::new(Vec::new()));
    let log = AuditLog::start(Arc::new(Collect(Arc::clone(&collected))));
    let tenant = Uuid::new_v4();
    log.record("cross_tenant_access", Some(tenant), "run lookup denied");

    for _ in 0..50 {
        if !collected.lock().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let events = collected.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, "cross_tenant_access");
    assert_eq!(events[0].tenant_id, Some(tenant));
}

#[tokio::test]
async fn recording_never_blocks() {
    // A sink that never drains: the buffer fills, later events drop.
    struct Stuck;
    #[async_trait]
    impl AuditSink for Stuck {
        async fn write(&self, _: AuditEvent) {
            std::future::pending::<()>().await;
        }
    }
    let log = AuditLog::start(Arc::new(Stuck));
    for _ in 0..2_000 {
        log.record("spam", None, "x");
    }
    assert!(log.dropped() > 0, "overflow must drop, not block");
}
