// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker pool: lease → spawn → supervise → report → ack/nack.

use crate::browser::BrowserRunner;
use crate::cleanup::{self, CleanupTask};
use crate::loadtest::LoadTestRunner;
use crate::outcome::OutcomeReporter;
use crate::probe::MonitorRunner;
use crate::runner::Runner;
use crate::{env, WorkerError};
use sc_admission::RegionRouter;
use sc_artifact::ArtifactSink;
use sc_core::{
    ExecKind, Location, QueueName, RunPayload, RunPatch, RunStatus, WorkerId,
    DATA_LIFECYCLE_QUEUE,
};
use sc_queue::{CancelPlane, LeasedJob, Substrate};
use sc_store::{Store, StoreError};
use sc_usage::CreditLedger;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: WorkerId,
    pub region: Location,
    pub location_filtering: bool,
    /// Max runs supervised concurrently by this process.
    pub max_parallel: usize,
    pub idle_poll: Duration,
    pub run_timeout: Duration,
    pub reclaim_interval: Duration,
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        Self {
            worker_id: WorkerId::new(),
            region: env::worker_location(),
            location_filtering: env::location_filtering(),
            max_parallel: 4,
            idle_poll: Duration::from_millis(500),
            run_timeout: env::default_run_timeout(),
            reclaim_interval: Duration::from_secs(30),
        }
    }
}

pub struct WorkerPool<S, Q, A, L, P> {
    pub(crate) config: WorkerConfig,
    store: Arc<S>,
    substrate: Arc<Q>,
    cancel: Arc<P>,
    reporter: OutcomeReporter<S, Q, A, L, P>,
    browser: BrowserRunner,
    loadtest: LoadTestRunner,
    monitor: MonitorRunner,
}

impl<S, Q, A, L, P> WorkerPool<S, Q, A, L, P>
where
    S: Store,
    Q: Substrate,
    A: ArtifactSink,
    L: CreditLedger,
    P: CancelPlane,
{
    pub fn new(
        config: WorkerConfig,
        store: Arc<S>,
        substrate: Arc<Q>,
        sink: Arc<A>,
        ledger: Arc<L>,
        cancel: Arc<P>,
    ) -> Result<Self, WorkerError> {
        let kill_grace = env::kill_grace();
        let cancel_poll = env::cancel_poll_interval();
        let browser = BrowserRunner::new(
            env::playwright_bin_path(),
            config.run_timeout,
            kill_grace,
            cancel_poll,
        );
        let loadtest = LoadTestRunner::new(
            env::k6_bin_path(),
            env::k6_max_concurrency(),
            config.run_timeout,
            kill_grace,
            cancel_poll,
        );
        let monitor = MonitorRunner::new()?;
        let reporter = OutcomeReporter::new(
            Arc::clone(&store),
            Arc::clone(&substrate),
            sink,
            ledger,
            Arc::clone(&cancel),
        );
        Ok(Self { config, store, substrate, cancel, reporter, browser, loadtest, monitor })
    }

    /// Queues this worker drains, in priority order.
    pub fn consume_queues(&self) -> Vec<String> {
        let router = RegionRouter::new(self.config.location_filtering);
        let mut queues = Vec::new();
        for kind in ExecKind::ALL {
            queues.extend(router.worker_queues(kind, self.config.region));
        }
        queues.push(DATA_LIFECYCLE_QUEUE.to_string());
        queues
    }

    /// Main loop. Returns when `shutdown` fires and in-flight runs drain.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let queues = self.consume_queues();
        let visibility = env::lease_visibility(self.config.run_timeout);
        tracing::info!(
            worker = %self.config.worker_id,
            region = %self.config.region,
            queues = ?queues,
            "worker registered"
        );

        let reclaimer = {
            let pool = Arc::clone(&self);
            let queues = queues.clone();
            let token = shutdown.child_token();
            tokio::spawn(async move { pool.reclaim_loop(queues, token).await })
        };

        let slots = Arc::new(Semaphore::new(self.config.max_parallel));
        loop {
            let permit = tokio::select! {
                _ = shutdown.cancelled() => break,
                permit = Arc::clone(&slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            match self
                .substrate
                .lease(&queues, &self.config.worker_id, visibility)
                .await
            {
                Ok(Some(job)) => {
                    let pool = Arc::clone(&self);
                    tokio::spawn(async move {
                        pool.process(job).await;
                        drop(permit);
                    });
                }
                Ok(None) => {
                    drop(permit);
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.config.idle_poll) => {}
                    }
                }
                Err(e) => {
                    drop(permit);
                    tracing::warn!(error = %e, "lease failed, backing off");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        // Drain: reacquire every slot, which waits for in-flight runs.
        let _ = slots.acquire_many(self.config.max_parallel as u32).await;
        reclaimer.abort();
        tracing::info!(worker = %self.config.worker_id, "worker drained");
    }

    async fn reclaim_loop(&self, queues: Vec<String>, shutdown: CancellationToken) {
        let mut tick = tokio::time::interval(self.config.reclaim_interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tick.tick() => {}
            }
            for queue in &queues {
                match self.substrate.reclaim_stalled(queue).await {
                    Ok(0) => {}
                    Ok(n) => tracing::warn!(queue, reclaimed = n, "stalled jobs reclaimed"),
                    Err(e) => tracing::warn!(queue, error = %e, "reclaim failed"),
                }
            }
        }
    }

    /// Handle one leased job end to end.
    pub(crate) async fn process(&self, job: LeasedJob) {
        if job.queue == DATA_LIFECYCLE_QUEUE {
            self.process_cleanup(&job).await;
            return;
        }

        let payload: RunPayload = match serde_json::from_value(job.payload.clone()) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(queue_job = %job.queue_job_id, error = %e, "undecodable payload");
                self.settle_nack(&job, false, "undecodable payload").await;
                return;
            }
        };

        // The leasing worker performs queued → running.
        match self
            .store
            .transition_run(payload.run_id, RunStatus::Queued, RunStatus::Running, RunPatch::default())
            .await
        {
            Ok(_) => {}
            Err(StoreError::StateConflict { current: RunStatus::Running, .. }) => {
                // Stalled redelivery; the previous delivery died mid-run.
                tracing::warn!(run_id = %payload.run_id, attempt = job.attempt, "resuming after stall");
            }
            Err(StoreError::StateConflict { current, .. }) if current.is_terminal() => {
                // Cancelled (or otherwise settled) while queued.
                tracing::info!(run_id = %payload.run_id, %current, "run settled before lease");
                if let Err(e) = self.substrate.ack(&job, None).await {
                    tracing::warn!(error = %e, "ack of settled run failed");
                }
                return;
            }
            Err(StoreError::NotFound(_)) => {
                self.settle_nack(&job, false, "run row missing").await;
                return;
            }
            Err(e) => {
                self.settle_nack(&job, true, &format!("transition failed: {e}")).await;
                return;
            }
        }

        let runner: &dyn Runner = match QueueName::parse(&job.queue) {
            Some(QueueName::Exec { kind: ExecKind::Playwright, .. }) => &self.browser,
            Some(QueueName::Exec { kind: ExecKind::K6, .. }) => &self.loadtest,
            Some(QueueName::Exec { kind: ExecKind::Monitor, .. }) => &self.monitor,
            _ => {
                self.settle_nack(&job, false, "not an execution queue").await;
                return;
            }
        };

        match runner.execute(&payload, self.cancel.as_ref()).await {
            Ok(result) => {
                if let Err(e) = self.reporter.report(&job, &payload, result).await {
                    tracing::error!(run_id = %payload.run_id, error = %e, "outcome report failed");
                    self.settle_nack(&job, true, &format!("report failed: {e}")).await;
                }
            }
            Err(e) => {
                tracing::error!(run_id = %payload.run_id, error = %e, "runner failed");
                if job.attempt >= job.max_attempts {
                    // Last delivery: the run must not be left `running`.
                    let patch = RunPatch {
                        error_details: Some(crate::sanitize::sanitize_error(
                            &e.to_string(),
                            &payload.secrets,
                        )),
                        ..RunPatch::default()
                    };
                    if let Err(te) = self
                        .store
                        .transition_run(payload.run_id, RunStatus::Running, RunStatus::Error, patch)
                        .await
                    {
                        tracing::warn!(run_id = %payload.run_id, error = %te, "error write skipped");
                    }
                }
                self.settle_nack(&job, true, &e.to_string()).await;
            }
        }
    }

    async fn process_cleanup(&self, job: &LeasedJob) {
        let task: CleanupTask = match serde_json::from_value(job.payload.clone()) {
            Ok(task) => task,
            Err(e) => {
                self.settle_nack(job, false, &format!("bad cleanup task: {e}")).await;
                return;
            }
        };
        match cleanup::handle(self.store.as_ref(), &task).await {
            Ok(deleted) => {
                let value = serde_json::json!({"success": true, "deleted": deleted});
                if let Err(e) = self.substrate.ack(job, Some(value)).await {
                    tracing::warn!(error = %e, "cleanup ack failed");
                }
            }
            Err(e) => self.settle_nack(job, true, &e.to_string()).await,
        }
    }

    async fn settle_nack(&self, job: &LeasedJob, retriable: bool, reason: &str) {
        if let Err(e) = self.substrate.nack(job, retriable, reason).await {
            tracing::error!(queue_job = %job.queue_job_id, error = %e, "nack failed");
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
