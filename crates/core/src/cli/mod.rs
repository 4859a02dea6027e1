//! Concrete CLI-backed client.
//!
//! `client.rs` owns discovery and execution; domain modules add
//! `impl CliClient` blocks per subsystem.

pub mod client;
pub mod container;
pub mod image;
pub mod network;
pub mod volume;

pub use client::{CliClient, CliError, CLI_BINARY, DEFAULT_INSTALL_PATHS};
