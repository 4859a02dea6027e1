//! Stats polling.
//!
//! One metrics subscription per container id, each owning its own task and
//! interval timer. A tick awaits its fetch inline, so at most one fetch is
//! in flight per container at any time; ticks that come due while a fetch
//! is pending are skipped outright (`MissedTickBehavior::Skip`), never
//! queued or run concurrently.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::cli::client::CliError;
use crate::client::ops::RuntimeOps;
use crate::config::CoreConfig;
use crate::event::CoreEvent;
use crate::model::ContainerStats;

/// Boxed stats fetch, injectable for tests.
pub(crate) type StatsFetch = Arc<
    dyn Fn(String) -> Pin<Box<dyn std::future::Future<Output = Result<ContainerStats, CliError>> + Send>>
        + Send
        + Sync,
>;

struct PollEntry {
    generation: u64,
    cancel: oneshot::Sender<()>,
}

pub struct PollManager {
    entries: Arc<DashMap<String, PollEntry>>,
    interval: Duration,
    generation: AtomicU64,
}

impl PollManager {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            interval: Duration::from_millis(config.stats_poll_interval_ms),
            generation: AtomicU64::new(0),
        }
    }

    pub fn active_subscriptions(&self) -> usize {
        self.entries.len()
    }

    /// Start polling stats for a container: one immediate fetch, then the
    /// fixed interval. An existing subscription for the id is stopped
    /// first.
    pub fn subscribe(
        &self,
        runtime: Arc<dyn RuntimeOps>,
        container_id: &str,
        sink: mpsc::Sender<CoreEvent>,
    ) {
        let fetch: StatsFetch = Arc::new(move |id: String| {
            let runtime = Arc::clone(&runtime);
            Box::pin(async move { runtime.container_stats(&id).await })
        });
        self.subscribe_with(container_id, fetch, sink);
    }

    pub(crate) fn subscribe_with(
        &self,
        container_id: &str,
        fetch: StatsFetch,
        sink: mpsc::Sender<CoreEvent>,
    ) {
        self.unsubscribe(container_id);

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        self.entries.insert(
            container_id.to_string(),
            PollEntry {
                generation,
                cancel: cancel_tx,
            },
        );

        let registry = Arc::clone(&self.entries);
        let container_id = container_id.to_string();
        let poll_interval = self.interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut cancel_rx => break,
                    _ = interval.tick() => {
                        // Awaited inline: the next tick cannot fire until
                        // this fetch resolves.
                        match fetch(container_id.clone()).await {
                            Ok(stats) => {
                                let sent = sink
                                    .send(CoreEvent::Stats {
                                        container_id: container_id.clone(),
                                        stats,
                                    })
                                    .await;
                                if sent.is_err() {
                                    debug!(container_id, "stats sink dropped; stopping poll");
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(container_id, error = %e, "stats fetch failed; stopping poll");
                                break;
                            }
                        }
                    }
                }
            }

            registry.remove_if(&container_id, |_, entry| entry.generation == generation);
        });
    }

    /// Stop polling a container. Clears the timer immediately; any fetch
    /// already in flight is abandoned cooperatively.
    pub fn unsubscribe(&self, container_id: &str) {
        if let Some((_, entry)) = self.entries.remove(container_id) {
            let _ = entry.cancel.send(());
        }
    }

    /// Stop every subscription. Snapshots the key set before iterating.
    pub fn stop_all(&self) {
        let keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            self.unsubscribe(&key);
        }
    }
}
