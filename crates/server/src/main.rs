// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! scd — the Supercheck app-node daemon.
//!
//! Hosts the submission API, the event hub, and the SSE gateway, plus the
//! scheduler-queue consumer. One process per app node; the hub is wired at
//! startup and torn down with the server.

use sc_admission::{AdmissionController, RegionRouter};
use sc_queue::{
    CancelPlane, RateLimiter, RedisCancelPlane, RedisRateLimiter, RedisSubstrate, Substrate,
};
use sc_server::audit::{AuditLog, TracingSink};
use sc_server::hub::EventHub;
use sc_server::notify::{spawn_notifier, NoopNotifier, NotifyHook};
use sc_server::state::{AppState, ServerConfig};
use sc_server::{env, routes, scheduler};
use sc_store::{PgStore, SecretCipher, Store};
use sc_usage::{CreditLedger, Ledger, RedisCounter};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_env("SC_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let database_url = env::database_url().ok_or("DATABASE_URL is required")?;
    let redis_url = env::redis_url();

    let cipher = match std::env::var("SC_SECRETS_KEY") {
        Ok(key) => Some(SecretCipher::from_base64(&key)?),
        Err(_) => None,
    };
    let pg = PgStore::connect(&database_url, cipher).await?;
    pg.migrate().await?;
    let store: Arc<dyn Store> = Arc::new(pg.clone());

    let substrate: Arc<dyn Substrate> = Arc::new(RedisSubstrate::connect(&redis_url).await?);
    let cancel: Arc<dyn CancelPlane> = Arc::new(RedisCancelPlane::connect(&redis_url).await?);
    let redis_client = redis::Client::open(redis_url.as_str())?;
    let counter_conn = redis::aio::ConnectionManager::new(redis_client).await?;
    let ledger: Arc<dyn CreditLedger> =
        Arc::new(Ledger::new(RedisCounter::new(counter_conn.clone()), Arc::new(pg)));
    let ratelimit: Option<Arc<dyn RateLimiter>> =
        Some(Arc::new(RedisRateLimiter::new(counter_conn)));

    let config = ServerConfig {
        self_hosted: env::self_hosted(),
        cron_secret: env::cron_secret(),
        submit_rate_limit: env::submit_rate_limit(),
    };
    let admission = Arc::new(AdmissionController::new(
        Arc::clone(&store),
        Arc::clone(&substrate),
        Arc::clone(&ledger),
        RegionRouter::new(env::location_filtering()),
        config.self_hosted,
    ));

    let hub = EventHub::new();
    let shutdown = CancellationToken::new();
    let hub_pump = hub.attach(Arc::clone(&substrate), shutdown.clone());

    // Notification senders are external collaborators; the default build
    // registers the no-op hook.
    let hooks: Vec<Arc<dyn NotifyHook>> = vec![Arc::new(NoopNotifier)];
    let notifier = spawn_notifier(&hub, Arc::clone(&store), hooks, shutdown.clone());

    let state = AppState::new(
        store,
        substrate,
        cancel,
        ledger,
        admission,
        hub,
        AuditLog::start(Arc::new(TracingSink)),
        ratelimit,
        config,
    );

    let scheduler_task = tokio::spawn(scheduler::run_scheduler(state.clone(), shutdown.clone()));

    let addr = env::http_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(async move {
            wait_for_signal().await;
            tracing::info!("shutdown signal received");
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    let _ = scheduler_task.await;
    let _ = notifier.await;
    let _ = hub_pump.await;
    Ok(())
}

async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            tracing::error!(error = %e, "SIGTERM handler install failed");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = term.recv() => {}
        _ = tokio::signal::ctrl_c() => {}
    }
}
