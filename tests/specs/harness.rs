// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixture: the whole backbone wired over memory fakes, plus a
//! stub HTTP endpoint so probe runs have something real to hit.

use sc_admission::{AdmissionController, RegionRouter};
use sc_artifact::MemorySink;
use sc_core::Location;
use sc_queue::{MemoryCancelPlane, MemorySubstrate};
use sc_store::MemoryStore;
use sc_usage::{Ledger, MemoryCounter};
use sc_worker::{WorkerConfig, WorkerPool};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

pub type SpecLedger = Ledger<MemoryCounter, MemoryStore>;
pub type SpecController = AdmissionController<MemoryStore, MemorySubstrate, SpecLedger>;
pub type SpecPool =
    WorkerPool<MemoryStore, MemorySubstrate, MemorySink, SpecLedger, MemoryCancelPlane>;

pub struct Backbone {
    pub store: Arc<MemoryStore>,
    pub substrate: Arc<MemorySubstrate>,
    pub cancel: Arc<MemoryCancelPlane>,
    pub admission: SpecController,
    pub tenant_id: Uuid,
    pub project_id: Uuid,
}

impl Backbone {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let substrate = Arc::new(MemorySubstrate::new());
        let cancel = Arc::new(MemoryCancelPlane::new());
        let ledger = Arc::new(Ledger::new(MemoryCounter::new(), Arc::clone(&store)));
        let (tenant_id, project_id) = store.seed_tenant();
        let admission = AdmissionController::new(
            Arc::clone(&store),
            Arc::clone(&substrate),
            ledger,
            RegionRouter::new(true),
            false,
        );
        Self { store, substrate, cancel, admission, tenant_id, project_id }
    }

    /// A worker pool pinned to `region`.
    pub fn pool(&self, region: Location) -> Arc<SpecPool> {
        let ledger = Arc::new(Ledger::new(MemoryCounter::new(), Arc::clone(&self.store)));
        let config = WorkerConfig {
            worker_id: sc_core::WorkerId::new(),
            region,
            location_filtering: true,
            max_parallel: 2,
            idle_poll: Duration::from_millis(20),
            run_timeout: Duration::from_secs(30),
            reclaim_interval: Duration::from_millis(100),
        };
        Arc::new(
            WorkerPool::new(
                config,
                Arc::clone(&self.store),
                Arc::clone(&self.substrate),
                Arc::new(MemorySink::new()),
                ledger,
                Arc::clone(&self.cancel),
            )
            .expect("pool construction"),
        )
    }

    /// Wait until the run reaches a terminal state (or panic after 5s).
    pub async fn wait_terminal(&self, run_id: sc_core::RunId) -> sc_core::Run {
        for _ in 0..100 {
            if let Some(run) = self.store.run_snapshot(run_id) {
                if run.status.is_terminal() {
                    return run;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("run {run_id} never reached a terminal state");
    }
}

/// Tiny HTTP endpoint returning the given status line on every request.
pub async fn serve_status(status_line: &'static str) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = sock.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok"
            );
            let _ = sock.write_all(response.as_bytes()).await;
        }
    });
    format!("http://{addr}/")
}

/// A probe submission for the given URL.
pub fn probe_request(backbone: &Backbone, url: &str) -> sc_admission::SubmitRequest {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    sc_admission::SubmitRequest {
        tenant_id: backbone.tenant_id,
        project_id: backbone.project_id,
        test_type: sc_core::TestType::Synthetic,
        script_b64: Some(STANDARD.encode(url)),
        test_id: None,
        location: Some("us-east".to_string()),
        trigger: sc_core::Trigger::Api,
        metadata: sc_core::RunMetadata::default(),
        timeout_ms: None,
        credit_units: None,
        job_id: None,
    }
}
