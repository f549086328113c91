// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! scwd — the Supercheck worker daemon.
//!
//! Connects to Redis and Postgres, registers a region-pinned worker pool,
//! and drains execution queues until SIGTERM/SIGINT, then shuts down
//! gracefully (in-flight runs finish first).

use sc_artifact::{BucketConfig, S3Sink, SinkLimits};
use sc_queue::{RedisCancelPlane, RedisSubstrate};
use sc_store::{PgStore, SecretCipher};
use sc_usage::{Ledger, RedisCounter};
use sc_worker::env;
use sc_worker::{WorkerConfig, WorkerPool};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_env("SC_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "worker failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = WorkerConfig::from_env();
    let redis_url = env::redis_url();
    let database_url = env::database_url().ok_or("DATABASE_URL is required")?;

    let cipher = match std::env::var("SC_SECRETS_KEY") {
        Ok(key) => Some(SecretCipher::from_base64(&key)?),
        Err(_) => None,
    };
    let store = Arc::new(PgStore::connect(&database_url, cipher).await?);
    store.migrate().await?;

    let substrate = Arc::new(RedisSubstrate::connect(&redis_url).await?);
    let cancel = Arc::new(RedisCancelPlane::connect(&redis_url).await?);
    let redis_client = redis::Client::open(redis_url.as_str())?;
    let counter_conn = redis::aio::ConnectionManager::new(redis_client).await?;
    let ledger = Arc::new(Ledger::new(RedisCounter::new(counter_conn), Arc::clone(&store)));

    let sink = Arc::new(
        S3Sink::from_env(
            BucketConfig { runs: env::bucket_runs(), reports: env::bucket_reports() },
            SinkLimits::default(),
        )
        .await,
    );

    let pool = Arc::new(WorkerPool::new(config, store, substrate, sink, ledger, cancel)?);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("shutdown signal received, draining");
        signal_token.cancel();
    });

    pool.run(shutdown).await;
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
