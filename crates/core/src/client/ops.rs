//! RuntimeOps trait — abstract interface over the container runtime.
//!
//! Every consumer (sessions, pollers, the UI shell) accesses the runtime
//! through this trait. `live.rs` provides the real CLI-backed
//! implementation; `fake.rs` provides the simulated one.

use std::collections::HashMap;
use std::pin::Pin;

use crate::cli::client::CliError;
use crate::client::stream::{ExecHandle, StreamHandle};
use crate::model::{
    Container, ContainerStats, Image, Network, ProgressEvent, SystemCounts, Volume,
};

/// Everything needed to create (and optionally start) a container.
#[derive(Debug, Clone, Default)]
pub struct RunSpec {
    pub image: String,
    pub name: Option<String>,
    /// When false, a single `create` invocation is issued and its failure
    /// propagates unchanged; there is no `run`+`stop` fallback.
    pub auto_start: bool,
    pub detach: bool,
    pub remove_on_exit: bool,
    pub network: Option<String>,
    /// Validated `host:container[/proto]` strings.
    pub ports: Vec<String>,
    /// Validated `source:target[:ro]` strings.
    pub volumes: Vec<String>,
    pub env: HashMap<String, String>,
    pub labels: HashMap<String, String>,
    pub command: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BuildSpec {
    pub context_dir: String,
    pub tag: String,
    pub dockerfile: Option<String>,
}

/// Options for attaching a container to a network. Argv order derived from
/// these is fixed: `--ip` first, then `--alias` (comma-joined), then
/// network, then container.
#[derive(Debug, Clone, Default)]
pub struct ConnectOpts {
    pub ip: Option<String>,
    pub aliases: Vec<String>,
}

/// Unified async interface over the container runtime.
///
/// Object-safe thanks to `Pin<Box<…>>` returns. Implementations must be
/// `Send + Sync` so they can live inside an `Arc` shared by every session
/// and poller. Mutating calls surface exactly one attempt's outcome;
/// retries are the caller's decision, never made here.
pub trait RuntimeOps: Send + Sync {
    // ── Containers ──────────────────────────────────────────────

    fn list_containers(
        &self,
        all: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<Container>, CliError>> + Send + '_>>;

    fn inspect_container<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Container, CliError>> + Send + 'a>>;

    fn run_container(
        &self,
        spec: RunSpec,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String, CliError>> + Send + '_>>;

    fn stop_container<'a>(
        &'a self,
        id: &'a str,
        timeout_secs: Option<u32>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>>;

    fn start_container<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>>;

    fn restart_container<'a>(
        &'a self,
        id: &'a str,
        timeout_secs: Option<u32>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>>;

    fn remove_container<'a>(
        &'a self,
        id: &'a str,
        force: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>>;

    fn container_stats<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ContainerStats, CliError>> + Send + 'a>>;

    // ── Streaming ───────────────────────────────────────────────

    fn stream_logs<'a>(
        &'a self,
        id: &'a str,
        tail: Option<u32>,
        follow: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<StreamHandle, CliError>> + Send + 'a>>;

    fn open_exec<'a>(
        &'a self,
        id: &'a str,
        command: Vec<String>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ExecHandle, CliError>> + Send + 'a>>;

    // ── Images ──────────────────────────────────────────────────

    fn list_images(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<Image>, CliError>> + Send + '_>>;

    fn inspect_image<'a>(
        &'a self,
        reference: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Image, CliError>> + Send + 'a>>;

    /// Progress is reported as a stream the operation writes into; dropping
    /// the stream cancels the pull.
    fn pull_image<'a>(
        &'a self,
        reference: &'a str,
    ) -> Pin<Box<dyn tokio_stream::Stream<Item = Result<ProgressEvent, CliError>> + Send + 'a>>;

    fn build_image(
        &self,
        spec: BuildSpec,
    ) -> Pin<Box<dyn tokio_stream::Stream<Item = Result<ProgressEvent, CliError>> + Send + '_>>;

    fn remove_image<'a>(
        &'a self,
        reference: &'a str,
        force: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>>;

    // ── Volumes ─────────────────────────────────────────────────

    fn list_volumes(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<Volume>, CliError>> + Send + '_>>;

    fn inspect_volume<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Volume, CliError>> + Send + 'a>>;

    fn create_volume<'a>(
        &'a self,
        name: &'a str,
        driver: Option<&'a str>,
        labels: HashMap<String, String>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Volume, CliError>> + Send + 'a>>;

    fn remove_volume<'a>(
        &'a self,
        name: &'a str,
        force: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>>;

    // ── Networks ────────────────────────────────────────────────

    fn list_networks(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<Network>, CliError>> + Send + '_>>;

    fn inspect_network<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Network, CliError>> + Send + 'a>>;

    fn create_network<'a>(
        &'a self,
        name: &'a str,
        subnet: Option<&'a str>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Network, CliError>> + Send + 'a>>;

    fn remove_network<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>>;

    fn connect_network<'a>(
        &'a self,
        network: &'a str,
        container: &'a str,
        opts: ConnectOpts,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>>;

    fn disconnect_network<'a>(
        &'a self,
        network: &'a str,
        container: &'a str,
        force: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>>;

    // ── System ──────────────────────────────────────────────────

    /// Cheap availability check; never errors.
    fn ping(&self) -> Pin<Box<dyn std::future::Future<Output = bool> + Send + '_>>;

    /// Path of the driven binary, if any (`None` for the simulated backend).
    fn binary_path(&self) -> Option<std::path::PathBuf>;

    fn version(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String, CliError>> + Send + '_>>;

    fn system_counts(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<SystemCounts, CliError>> + Send + '_>>;
}
