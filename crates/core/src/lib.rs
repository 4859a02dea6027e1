// Domain-driven module structure for the Deckhand core.

// Core infrastructure
pub mod cli;
pub mod client;
pub mod config;
pub mod model;
pub mod parser;

// Domain modules
pub mod event;
pub mod poll;
pub mod session;
pub mod state;
pub mod trace;
pub mod validate;

pub use cli::client::{CliClient, CliError};
pub use client::ops::RuntimeOps;
pub use config::CoreConfig;
pub use event::CoreEvent;
pub use state::{CoreState, SharedState};
