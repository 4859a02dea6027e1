//! Streaming session manager.
//!
//! Owns the long-lived log-tail and interactive-exec sessions built on top
//! of the selected backend. Registries are `DashMap`s mutated from the
//! event loop and from session tasks; bulk operations snapshot the key set
//! before iterating so concurrent self-removal never invalidates the walk.

pub mod exec;
pub mod logs;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use crate::client::stream::ExecControl;
use crate::config::CoreConfig;
use exec::ExecSessionEntry;
use logs::LogSessionEntry;

/// Identity of a UI surface (window, pane) that owns sessions. Exec
/// operations are honored only when the claimed identity matches the
/// session's recorded owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

pub struct SessionManager {
    pub(crate) logs: Arc<DashMap<String, LogSessionEntry>>,
    pub(crate) execs: Arc<DashMap<String, ExecSessionEntry>>,
    pub(crate) flush_interval: Duration,
    pub(crate) buffer_cap: usize,
    /// Monotonic generation stamped onto each session so a finished task
    /// removes only its own registry entry, never a successor's.
    pub(crate) generation: AtomicU64,
    pub(crate) exec_counter: AtomicU64,
}

impl SessionManager {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            logs: Arc::new(DashMap::new()),
            execs: Arc::new(DashMap::new()),
            flush_interval: Duration::from_millis(config.log_flush_interval_ms),
            buffer_cap: config.log_buffer_max_bytes,
            generation: AtomicU64::new(0),
            exec_counter: AtomicU64::new(0),
        }
    }

    pub(crate) fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed)
    }

    pub fn active_log_sessions(&self) -> usize {
        self.logs.len()
    }

    pub fn active_exec_sessions(&self) -> usize {
        self.execs.len()
    }

    /// Terminate every active log and exec session. Used at process
    /// shutdown; safe with zero active sessions. Keys are snapshotted
    /// before iteration so sessions self-removing on close are tolerated.
    pub async fn shutdown_all(&self) {
        let log_keys: Vec<String> = self.logs.iter().map(|e| e.key().clone()).collect();
        for key in log_keys {
            self.unsubscribe_logs(&key);
        }

        let exec_keys: Vec<String> = self.execs.iter().map(|e| e.key().clone()).collect();
        for key in exec_keys {
            if let Some((_, entry)) = self.execs.remove(&key) {
                let _ = entry.control.send(ExecControl::Close).await;
            }
        }
    }
}
