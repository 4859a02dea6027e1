//! Live — implements `RuntimeOps` for the real CLI-backed [`CliClient`].

use std::collections::HashMap;
use std::pin::Pin;

use crate::cli::client::{CliClient, CliError};
use crate::client::ops::{BuildSpec, ConnectOpts, RunSpec, RuntimeOps};
use crate::client::stream::{ExecHandle, StreamHandle};
use crate::model::{
    Container, ContainerStats, ContainerStatus, Image, Network, ProgressEvent, SystemCounts,
    Volume,
};

impl RuntimeOps for CliClient {
    // ── Containers ──────────────────────────────────────────────

    fn list_containers(
        &self,
        all: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<Container>, CliError>> + Send + '_>>
    {
        Box::pin(self.list_containers(all))
    }

    fn inspect_container<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Container, CliError>> + Send + 'a>> {
        Box::pin(self.inspect_container(id))
    }

    fn run_container(
        &self,
        spec: RunSpec,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String, CliError>> + Send + '_>> {
        Box::pin(self.run_container(spec))
    }

    fn stop_container<'a>(
        &'a self,
        id: &'a str,
        timeout_secs: Option<u32>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>> {
        Box::pin(self.stop_container(id, timeout_secs))
    }

    fn start_container<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>> {
        Box::pin(self.start_container(id))
    }

    fn restart_container<'a>(
        &'a self,
        id: &'a str,
        timeout_secs: Option<u32>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>> {
        Box::pin(self.restart_container(id, timeout_secs))
    }

    fn remove_container<'a>(
        &'a self,
        id: &'a str,
        force: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>> {
        Box::pin(self.remove_container(id, force))
    }

    fn container_stats<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ContainerStats, CliError>> + Send + 'a>>
    {
        Box::pin(self.container_stats(id))
    }

    // ── Streaming ───────────────────────────────────────────────

    fn stream_logs<'a>(
        &'a self,
        id: &'a str,
        tail: Option<u32>,
        follow: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<StreamHandle, CliError>> + Send + 'a>>
    {
        Box::pin(self.stream_logs(id, tail, follow))
    }

    fn open_exec<'a>(
        &'a self,
        id: &'a str,
        command: Vec<String>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ExecHandle, CliError>> + Send + 'a>> {
        Box::pin(self.open_exec(id, command))
    }

    // ── Images ──────────────────────────────────────────────────

    fn list_images(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<Image>, CliError>> + Send + '_>> {
        Box::pin(self.list_images())
    }

    fn inspect_image<'a>(
        &'a self,
        reference: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Image, CliError>> + Send + 'a>> {
        Box::pin(self.inspect_image(reference))
    }

    fn pull_image<'a>(
        &'a self,
        reference: &'a str,
    ) -> Pin<Box<dyn tokio_stream::Stream<Item = Result<ProgressEvent, CliError>> + Send + 'a>>
    {
        self.pull_image_stream(reference)
    }

    fn build_image(
        &self,
        spec: BuildSpec,
    ) -> Pin<Box<dyn tokio_stream::Stream<Item = Result<ProgressEvent, CliError>> + Send + '_>>
    {
        self.build_image_stream(spec)
    }

    fn remove_image<'a>(
        &'a self,
        reference: &'a str,
        force: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>> {
        Box::pin(self.remove_image(reference, force))
    }

    // ── Volumes ─────────────────────────────────────────────────

    fn list_volumes(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<Volume>, CliError>> + Send + '_>> {
        Box::pin(self.list_volumes())
    }

    fn inspect_volume<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Volume, CliError>> + Send + 'a>> {
        Box::pin(self.inspect_volume(name))
    }

    fn create_volume<'a>(
        &'a self,
        name: &'a str,
        driver: Option<&'a str>,
        labels: HashMap<String, String>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Volume, CliError>> + Send + 'a>> {
        Box::pin(self.create_volume(name, driver, labels))
    }

    fn remove_volume<'a>(
        &'a self,
        name: &'a str,
        force: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>> {
        Box::pin(self.remove_volume(name, force))
    }

    // ── Networks ────────────────────────────────────────────────

    fn list_networks(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<Network>, CliError>> + Send + '_>> {
        Box::pin(self.list_networks())
    }

    fn inspect_network<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Network, CliError>> + Send + 'a>> {
        Box::pin(self.inspect_network(name))
    }

    fn create_network<'a>(
        &'a self,
        name: &'a str,
        subnet: Option<&'a str>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Network, CliError>> + Send + 'a>> {
        Box::pin(self.create_network(name, subnet))
    }

    fn remove_network<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>> {
        Box::pin(self.remove_network(name))
    }

    fn connect_network<'a>(
        &'a self,
        network: &'a str,
        container: &'a str,
        opts: ConnectOpts,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>> {
        Box::pin(self.connect_network(network, container, opts))
    }

    fn disconnect_network<'a>(
        &'a self,
        network: &'a str,
        container: &'a str,
        force: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>> {
        Box::pin(self.disconnect_network(network, container, force))
    }

    // ── System ──────────────────────────────────────────────────

    fn ping(&self) -> Pin<Box<dyn std::future::Future<Output = bool> + Send + '_>> {
        Box::pin(async move { self.version().await.is_ok() })
    }

    fn binary_path(&self) -> Option<std::path::PathBuf> {
        Some(CliClient::binary_path(self).to_path_buf())
    }

    fn version(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String, CliError>> + Send + '_>> {
        Box::pin(self.version())
    }

    fn system_counts(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<SystemCounts, CliError>> + Send + '_>>
    {
        Box::pin(async move {
            let containers = self.list_containers(true).await?;
            let images = self.list_images().await?;
            let volumes = self.list_volumes().await?;
            let networks = self.list_networks().await?;
            Ok(SystemCounts {
                running: containers
                    .iter()
                    .filter(|c| c.status == ContainerStatus::Running)
                    .count(),
                containers: containers.len(),
                images: images.len(),
                volumes: volumes.len(),
                networks: networks.len(),
            })
        })
    }
}
