// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification dispatch seam.
//!
//! Senders (email, Slack, Teams, Discord, Telegram) live outside the core;
//! this is the hook they register against. Dispatch is best-effort fan-in:
//! every hook runs for every terminal event, failures are logged and never
//! affect the run's own completion.

use crate::hub::{EventHub, HubMessage};
use async_trait::async_trait;
use futures_util::future::join_all;
use sc_core::{RunId, RunStatus};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One notification channel.
#[async_trait]
pub trait NotifyHook: Send + Sync + 'static {
    async fn run_terminal(
        &self,
        run_id: RunId,
        project_id: Uuid,
        status: RunStatus,
    ) -> Result<(), String>;
}

/// Self-hosted default: notifications disabled.
#[derive(Clone, Default)]
pub struct NoopNotifier;

#[async_trait]
impl NotifyHook for NoopNotifier {
    async fn run_terminal(&self, _: RunId, _: Uuid, _: RunStatus) -> Result<(), String> {
        Ok(())
    }
}

/// Watch the hub and fan terminal events out to every hook.
///
/// The fan-in always "succeeds": hook errors are logged, not raised.
pub fn spawn_notifier(
    hub: &EventHub,
    store: Arc<dyn sc_store::Store>,
    hooks: Vec<Arc<dyn NotifyHook>>,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let mut subscription = hub.subscribe();
    tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                _ = shutdown.cancelled() => return,
                message = subscription.recv() => message,
            };
            let event = match message {
                HubMessage::Event(event) if event.status.is_terminal() => event,
                _ => continue,
            };
            let Some(run_id) = event.run_id else { continue };
            let Ok(Some(run)) = store.run(run_id).await else { continue };

            let dispatches = hooks.iter().map(|hook| {
                let hook = Arc::clone(hook);
                async move { hook.run_terminal(run_id, run.project_id, event.status).await }
            });
            for result in join_all(dispatches).await {
                if let Err(reason) = result {
                    tracing::warn!(run_id = %run_id, reason, "notification hook failed");
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
