//! Core state — the context object handed to every consumer.
//!
//! Constructed once at startup and passed by reference (no global mutable
//! state); the backend inside it is the process-wide selection from
//! `client::select`. Test harnesses inject a backend directly with
//! [`CoreState::with_runtime`] and reset the selector between cases.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::cli::client::CliError;
use crate::client::ops::RuntimeOps;
use crate::client::select;
use crate::config::CoreConfig;
use crate::event::CoreEvent;
use crate::poll::PollManager;
use crate::session::{ClientId, SessionManager};

pub struct CoreState {
    pub config: CoreConfig,
    pub runtime: Arc<dyn RuntimeOps>,
    pub sessions: SessionManager,
    pub pollers: PollManager,
}

pub type SharedState = Arc<CoreState>;

impl CoreState {
    /// Select the backend and build the shared context. Called once at
    /// startup by the UI shell.
    pub async fn build(config: CoreConfig) -> SharedState {
        let runtime = select::global().get(&config).await;
        Arc::new(Self::with_runtime(config, runtime))
    }

    /// Build a context around an injected backend (tests, embedding).
    pub fn with_runtime(config: CoreConfig, runtime: Arc<dyn RuntimeOps>) -> Self {
        Self {
            sessions: SessionManager::new(&config),
            pollers: PollManager::new(&config),
            config,
            runtime,
        }
    }

    // ── Session conveniences (route through the shared backend) ─

    pub async fn subscribe_logs(
        &self,
        container_id: &str,
        tail: Option<u32>,
        sink: mpsc::Sender<CoreEvent>,
    ) -> Result<(), CliError> {
        self.sessions
            .subscribe_logs(&self.runtime, container_id, tail, sink)
            .await
    }

    pub fn unsubscribe_logs(&self, container_id: &str) {
        self.sessions.unsubscribe_logs(container_id);
    }

    pub async fn start_exec(
        &self,
        container_id: &str,
        command: Option<Vec<String>>,
        owner: ClientId,
        sink: mpsc::Sender<CoreEvent>,
    ) -> Result<String, CliError> {
        self.sessions
            .start_exec(&self.runtime, container_id, command, owner, sink)
            .await
    }

    pub async fn send_exec_input(&self, session_id: &str, claimant: &ClientId, data: Bytes) {
        self.sessions.send_exec_input(session_id, claimant, data).await;
    }

    pub async fn resize_exec(&self, session_id: &str, claimant: &ClientId, cols: u16, rows: u16) {
        self.sessions.resize_exec(session_id, claimant, cols, rows).await;
    }

    pub async fn close_exec(&self, session_id: &str, claimant: &ClientId) {
        self.sessions.close_exec(session_id, claimant).await;
    }

    pub fn subscribe_stats(&self, container_id: &str, sink: mpsc::Sender<CoreEvent>) {
        self.pollers
            .subscribe(Arc::clone(&self.runtime), container_id, sink);
    }

    /// Pull an image, forwarding each progress event to the sink. Returns
    /// once the transfer finishes; a dropped sink cancels the pull.
    pub async fn pull_image(
        &self,
        reference: &str,
        sink: mpsc::Sender<CoreEvent>,
    ) -> Result<(), CliError> {
        use futures_util::StreamExt;

        let mut progress = self.runtime.pull_image(reference);
        while let Some(item) = progress.next().await {
            let event = item?;
            let sent = sink
                .send(CoreEvent::PullProgress {
                    reference: reference.to_string(),
                    event,
                })
                .await;
            if sent.is_err() {
                break;
            }
        }
        Ok(())
    }

    /// Build an image from a context directory, forwarding step progress.
    pub async fn build_image(
        &self,
        spec: crate::client::ops::BuildSpec,
        sink: mpsc::Sender<CoreEvent>,
    ) -> Result<(), CliError> {
        use futures_util::StreamExt;

        let tag = spec.tag.clone();
        let mut progress = self.runtime.build_image(spec);
        while let Some(item) = progress.next().await {
            let event = item?;
            let sent = sink
                .send(CoreEvent::BuildProgress {
                    tag: tag.clone(),
                    event,
                })
                .await;
            if sent.is_err() {
                break;
            }
        }
        Ok(())
    }

    pub fn unsubscribe_stats(&self, container_id: &str) {
        self.pollers.unsubscribe(container_id);
    }

    /// Tear down every live session and poller. Called once at process
    /// shutdown.
    pub async fn shutdown(&self) {
        self.sessions.shutdown_all().await;
        self.pollers.stop_all();
    }
}
