//! Backend selection.
//!
//! Chooses between the CLI-backed and simulated runtimes once per process
//! lifetime: the first call probes, every later call returns the same
//! shared instance. `reset()` clears the memo and is reserved for test
//! harnesses.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cli::client::CliClient;
use crate::client::fake::SimRuntime;
use crate::client::ops::RuntimeOps;
use crate::config::{CoreConfig, FORCE_SIMULATED_ENV};

pub struct RuntimeSelector {
    cached: Mutex<Option<Arc<dyn RuntimeOps>>>,
}

impl RuntimeSelector {
    pub const fn new() -> Self {
        Self {
            cached: Mutex::const_new(None),
        }
    }

    /// Return the process-wide backend, selecting it on first use.
    pub async fn get(&self, config: &CoreConfig) -> Arc<dyn RuntimeOps> {
        let mut cached = self.cached.lock().await;
        if let Some(runtime) = cached.as_ref() {
            return Arc::clone(runtime);
        }
        let runtime = select_backend(config).await;
        *cached = Some(Arc::clone(&runtime));
        runtime
    }

    /// Drop the memoized backend so the next `get` re-selects. Test
    /// harnesses only.
    pub async fn reset(&self) {
        *self.cached.lock().await = None;
    }
}

impl Default for RuntimeSelector {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: RuntimeSelector = RuntimeSelector::new();

/// The process-wide selector used by `CoreState::build`.
pub fn global() -> &'static RuntimeSelector {
    &GLOBAL
}

fn env_forces_simulated() -> bool {
    matches!(
        std::env::var(FORCE_SIMULATED_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

async fn select_backend(config: &CoreConfig) -> Arc<dyn RuntimeOps> {
    if config.force_simulated || env_forces_simulated() {
        info!("simulated backend forced; skipping CLI discovery");
        return Arc::new(SimRuntime::seeded());
    }

    match CliClient::discover(config).await {
        Ok(client) => {
            info!(path = %client.binary_path().display(), "using container CLI backend");
            Arc::new(client)
        }
        Err(e) => {
            warn!(error = %e, "container CLI unavailable; falling back to simulated backend");
            Arc::new(SimRuntime::seeded())
        }
    }
}
