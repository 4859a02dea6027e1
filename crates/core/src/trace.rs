//! Tracing bootstrap.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise the tracing / logging subsystem. Called once by the host
/// shell before building the core state.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deckhand_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
