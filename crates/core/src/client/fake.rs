//! Fake — in-memory simulated backend.
//!
//! Implements [`RuntimeOps`] against a seeded in-memory fleet, for demo
//! mode and for running without the CLI installed. Every call sleeps a
//! small artificial latency so the UI exercises its loading states;
//! mutations edit the collections directly; pull/build emit a fixed
//! scripted progress sequence.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::cli::client::CliError;
use crate::client::ops::{BuildSpec, ConnectOpts, RunSpec, RuntimeOps};
use crate::client::stream::{
    ExecControl, ExecHandle, OutputSource, StreamEvent, StreamHandle, STREAM_CHANNEL_CAPACITY,
};
use crate::model::{
    Container, ContainerStats, ContainerStatus, Image, Network, ProgressEvent, ProgressPhase,
    SystemCounts, Volume,
};
use crate::validate::{validate_container_id, validate_image_ref, validate_name};

const LIST_LATENCY_MS: u64 = 80;
const INSPECT_LATENCY_MS: u64 = 50;
const MUTATE_LATENCY_MS: u64 = 150;
const SPAWN_LATENCY_MS: u64 = 250;
/// How long a simulated restart sits in the `restarting` state.
const RESTART_SETTLE_MS: u64 = 300;

const SEED_EPOCH: i64 = 1_721_000_000;

#[derive(Default)]
struct Inner {
    containers: Vec<Container>,
    images: Vec<Image>,
    volumes: Vec<Volume>,
    networks: Vec<Network>,
}

/// Simulated runtime with an in-memory fleet.
pub struct SimRuntime {
    inner: Arc<Mutex<Inner>>,
    next_id: AtomicU64,
}

async fn latency(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn seed_container(id: &str, image: &str, status: ContainerStatus, age: i64) -> Container {
    Container {
        id: id.to_string(),
        name: id.to_string(),
        image: image.to_string(),
        status,
        created_at: SEED_EPOCH - age,
        ports: Vec::new(),
        mounts: Vec::new(),
        env: Vec::new(),
        labels: HashMap::new(),
        command: None,
        network: Some("default".to_string()),
    }
}

fn seed_image(repository: &str, tag: &str, size: u64) -> Image {
    Image {
        id: format!("sha256:{:016x}", size.wrapping_mul(0x9e37_79b9_7f4a_7c15)),
        repository: repository.to_string(),
        tag: tag.to_string(),
        created_at: SEED_EPOCH - 86_400,
        size,
        labels: HashMap::new(),
        digest: None,
    }
}

fn seed_volume(name: &str) -> Volume {
    Volume {
        name: name.to_string(),
        driver: "local".to_string(),
        mountpoint: format!("/var/lib/deckhand/volumes/{}", name),
        created_at: SEED_EPOCH - 43_200,
        labels: HashMap::new(),
        size: None,
    }
}

fn seed_network(name: &str, subnet: &str) -> Network {
    Network {
        id: format!("sim-net-{}", name),
        name: name.to_string(),
        driver: "nat".to_string(),
        created_at: SEED_EPOCH - 43_200,
        subnet: Some(subnet.to_string()),
        gateway: subnet
            .split('/')
            .next()
            .and_then(|base| base.rsplit_once('.'))
            .map(|(prefix, _)| format!("{}.1", prefix)),
        labels: HashMap::new(),
        internal: false,
        state: Some("running".to_string()),
        ipv6_subnet: None,
    }
}

impl SimRuntime {
    /// An empty simulated runtime (tests seed what they need).
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            next_id: AtomicU64::new(1),
        }
    }

    /// The demo fleet: a few containers, their images, volumes, networks.
    pub fn seeded() -> Self {
        let inner = Inner {
            containers: vec![
                seed_container("web", "nginx:latest", ContainerStatus::Running, 7_200),
                seed_container("db", "postgres:16", ContainerStatus::Running, 86_400),
                seed_container("cache", "redis:7", ContainerStatus::Stopped, 3_600),
            ],
            images: vec![
                seed_image("nginx", "latest", 67_108_864),
                seed_image("postgres", "16", 157_286_400),
                seed_image("redis", "7", 41_943_040),
                seed_image("alpine", "latest", 3_145_728),
            ],
            volumes: vec![seed_volume("db-data"), seed_volume("cache-data")],
            networks: vec![
                seed_network("default", "192.168.65.0/24"),
                seed_network("backend", "172.20.0.0/16"),
            ],
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
            next_id: AtomicU64::new(1),
        }
    }

    /// Seed one container (test helper).
    pub async fn add_container(&self, container: Container) {
        self.inner.lock().await.containers.push(container);
    }

    fn fresh_id(&self) -> String {
        format!("sim-{:04}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn not_found(what: &str, id: &str) -> CliError {
        CliError::NotFound {
            stderr: format!("no such {}: {}", what, id),
        }
    }
}

impl Default for SimRuntime {
    fn default() -> Self {
        Self::seeded()
    }
}

impl RuntimeOps for SimRuntime {
    // ── Containers ──────────────────────────────────────────────

    fn list_containers(
        &self,
        all: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<Container>, CliError>> + Send + '_>>
    {
        Box::pin(async move {
            latency(LIST_LATENCY_MS).await;
            let state = self.inner.lock().await;
            Ok(state
                .containers
                .iter()
                .filter(|c| all || c.status == ContainerStatus::Running)
                .cloned()
                .collect())
        })
    }

    fn inspect_container<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Container, CliError>> + Send + 'a>> {
        Box::pin(async move {
            validate_container_id(id)?;
            latency(INSPECT_LATENCY_MS).await;
            let state = self.inner.lock().await;
            state
                .containers
                .iter()
                .find(|c| c.id == id || c.name == id)
                .cloned()
                .ok_or_else(|| Self::not_found("container", id))
        })
    }

    fn run_container(
        &self,
        spec: RunSpec,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String, CliError>> + Send + '_>> {
        Box::pin(async move {
            validate_image_ref(&spec.image)?;
            if let Some(name) = &spec.name {
                validate_name(name, "container")?;
            }
            latency(SPAWN_LATENCY_MS).await;

            let id = spec.name.clone().unwrap_or_else(|| self.fresh_id());
            let mut state = self.inner.lock().await;
            if state.containers.iter().any(|c| c.id == id) {
                return Err(CliError::AlreadyExists {
                    stderr: format!("container name {} already in use", id),
                });
            }

            let container = Container {
                id: id.clone(),
                name: id.clone(),
                image: spec.image.clone(),
                status: if spec.auto_start {
                    ContainerStatus::Running
                } else {
                    ContainerStatus::Stopped
                },
                created_at: SEED_EPOCH,
                ports: Vec::new(),
                mounts: Vec::new(),
                env: crate::config::CoreConfig::env_to_vec(&spec.env),
                labels: spec.labels.clone(),
                command: if spec.command.is_empty() {
                    None
                } else {
                    Some(spec.command.clone())
                },
                network: spec.network.clone(),
            };
            // New containers go to the top of the console's list.
            state.containers.insert(0, container);
            Ok(id)
        })
    }

    fn stop_container<'a>(
        &'a self,
        id: &'a str,
        _timeout_secs: Option<u32>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>> {
        Box::pin(async move {
            latency(MUTATE_LATENCY_MS).await;
            let mut state = self.inner.lock().await;
            match state.containers.iter_mut().find(|c| c.id == id || c.name == id) {
                Some(c) => {
                    c.status = ContainerStatus::Stopped;
                    Ok(())
                }
                None => Err(Self::not_found("container", id)),
            }
        })
    }

    fn start_container<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>> {
        Box::pin(async move {
            latency(MUTATE_LATENCY_MS).await;
            let mut state = self.inner.lock().await;
            match state.containers.iter_mut().find(|c| c.id == id || c.name == id) {
                Some(c) => {
                    c.status = ContainerStatus::Running;
                    Ok(())
                }
                None => Err(Self::not_found("container", id)),
            }
        })
    }

    fn restart_container<'a>(
        &'a self,
        id: &'a str,
        _timeout_secs: Option<u32>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>> {
        Box::pin(async move {
            latency(MUTATE_LATENCY_MS).await;
            {
                let mut state = self.inner.lock().await;
                match state.containers.iter_mut().find(|c| c.id == id || c.name == id) {
                    Some(c) => c.status = ContainerStatus::Restarting,
                    None => return Err(Self::not_found("container", id)),
                }
            }

            // Settle back to running after a delay, like a real restart.
            let inner = self.inner.clone();
            let id = id.to_string();
            tokio::spawn(async move {
                latency(RESTART_SETTLE_MS).await;
                let mut state = inner.lock().await;
                if let Some(c) = state
                    .containers
                    .iter_mut()
                    .find(|c| (c.id == id || c.name == id) && c.status == ContainerStatus::Restarting)
                {
                    c.status = ContainerStatus::Running;
                }
            });
            Ok(())
        })
    }

    fn remove_container<'a>(
        &'a self,
        id: &'a str,
        force: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>> {
        Box::pin(async move {
            latency(MUTATE_LATENCY_MS).await;
            let mut state = self.inner.lock().await;
            let Some(index) = state
                .containers
                .iter()
                .position(|c| c.id == id || c.name == id)
            else {
                return Err(Self::not_found("container", id));
            };
            if state.containers[index].status == ContainerStatus::Running && !force {
                return Err(CliError::Unknown {
                    stderr: format!("container {} is running: stop it first or use -f", id),
                });
            }
            state.containers.remove(index);
            Ok(())
        })
    }

    fn container_stats<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ContainerStats, CliError>> + Send + 'a>>
    {
        Box::pin(async move {
            latency(INSPECT_LATENCY_MS).await;
            let state = self.inner.lock().await;
            let container = state
                .containers
                .iter()
                .find(|c| c.id == id || c.name == id)
                .ok_or_else(|| Self::not_found("container", id))?;

            // Deterministic per-container baseline so charts look alive
            // but tests stay stable.
            let seed = container.id.bytes().map(u64::from).sum::<u64>();
            let running = container.status == ContainerStatus::Running;
            Ok(ContainerStats {
                container_id: container.id.clone(),
                cpu_percent: if running { (seed % 37) as f64 + 1.5 } else { 0.0 },
                memory_usage: if running { (seed % 512 + 64) * 1024 * 1024 } else { 0 },
                memory_limit: 2 * 1024 * 1024 * 1024,
                network_rx: if running { seed * 1024 } else { 0 },
                network_tx: if running { seed * 512 } else { 0 },
                block_read: if running { seed * 256 } else { 0 },
                block_write: if running { seed * 128 } else { 0 },
                timestamp: chrono::Utc::now().timestamp(),
            })
        })
    }

    // ── Streaming ───────────────────────────────────────────────

    fn stream_logs<'a>(
        &'a self,
        id: &'a str,
        tail: Option<u32>,
        follow: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<StreamHandle, CliError>> + Send + 'a>>
    {
        Box::pin(async move {
            latency(INSPECT_LATENCY_MS).await;
            let name = {
                let state = self.inner.lock().await;
                state
                    .containers
                    .iter()
                    .find(|c| c.id == id || c.name == id)
                    .map(|c| c.name.clone())
                    .ok_or_else(|| Self::not_found("container", id))?
            };

            let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
            let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
            let backlog = tail.unwrap_or(3).min(10);

            tokio::spawn(async move {
                for i in 0..backlog {
                    let line = format!("[sim] {} backlog line {}\n", name, i + 1);
                    if tx
                        .send(StreamEvent::Output {
                            source: OutputSource::Stdout,
                            data: Bytes::from(line),
                        })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }

                if !follow {
                    let _ = tx.send(StreamEvent::Exit { code: Some(0) }).await;
                    return;
                }

                let mut beat: u64 = 0;
                loop {
                    tokio::select! {
                        _ = &mut cancel_rx => return,
                        _ = latency(400) => {
                            beat += 1;
                            let line = format!("[sim] {} heartbeat {}\n", name, beat);
                            if tx
                                .send(StreamEvent::Output {
                                    source: OutputSource::Stdout,
                                    data: Bytes::from(line),
                                })
                                .await
                                .is_err()
                            {
                                return;
                            }
                        }
                    }
                }
            });

            Ok(StreamHandle::new(rx, cancel_tx))
        })
    }

    fn open_exec<'a>(
        &'a self,
        id: &'a str,
        _command: Vec<String>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ExecHandle, CliError>> + Send + 'a>> {
        Box::pin(async move {
            latency(INSPECT_LATENCY_MS).await;
            {
                let state = self.inner.lock().await;
                if !state.containers.iter().any(|c| c.id == id || c.name == id) {
                    return Err(Self::not_found("container", id));
                }
            }

            let (ev_tx, ev_rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
            let (ctl_tx, mut ctl_rx) = mpsc::channel::<ExecControl>(STREAM_CHANNEL_CAPACITY);

            // Scripted shell: echo input back, ignore resize, die on close.
            tokio::spawn(async move {
                while let Some(msg) = ctl_rx.recv().await {
                    match msg {
                        ExecControl::Input(data) => {
                            if ev_tx
                                .send(StreamEvent::Output {
                                    source: OutputSource::Stdout,
                                    data,
                                })
                                .await
                                .is_err()
                            {
                                return;
                            }
                        }
                        ExecControl::Resize { .. } => {}
                        ExecControl::Close => return,
                    }
                }
            });

            Ok(ExecHandle::new(ev_rx, ctl_tx))
        })
    }

    // ── Images ──────────────────────────────────────────────────

    fn list_images(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<Image>, CliError>> + Send + '_>> {
        Box::pin(async move {
            latency(LIST_LATENCY_MS).await;
            Ok(self.inner.lock().await.images.clone())
        })
    }

    fn inspect_image<'a>(
        &'a self,
        reference: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Image, CliError>> + Send + 'a>> {
        Box::pin(async move {
            validate_image_ref(reference)?;
            latency(INSPECT_LATENCY_MS).await;
            let state = self.inner.lock().await;
            state
                .images
                .iter()
                .find(|i| {
                    i.id == reference
                        || format!("{}:{}", i.repository, i.tag) == reference
                        || i.repository == reference
                })
                .cloned()
                .ok_or_else(|| Self::not_found("image", reference))
        })
    }

    fn pull_image<'a>(
        &'a self,
        reference: &'a str,
    ) -> Pin<Box<dyn tokio_stream::Stream<Item = Result<ProgressEvent, CliError>> + Send + 'a>>
    {
        let reference = reference.to_string();
        let inner = self.inner.clone();
        Box::pin(async_stream::stream! {
            if let Err(e) = validate_image_ref(&reference) {
                yield Err(e.into());
                return;
            }

            let total: u64 = 48 * 1024 * 1024;
            let script: Vec<ProgressEvent> = {
                let mut events = Vec::new();
                events.push(ProgressEvent::new(
                    ProgressPhase::Resolving,
                    5,
                    format!("Resolving {}", reference),
                ));
                for fraction in [25u64, 50, 75, 100] {
                    let mut ev = ProgressEvent::new(
                        ProgressPhase::Downloading,
                        (fraction * 30 / 100 + 30).min(100) as u8,
                        format!("Downloading {}% of {}", fraction, reference),
                    );
                    ev.current = Some(total * fraction / 100);
                    ev.total = Some(total);
                    events.push(ev);
                }
                events.push(ProgressEvent::new(ProgressPhase::Verifying, 90, "Verifying checksum"));
                events.push(ProgressEvent::new(ProgressPhase::Extracting, 95, "Extracting layers"));
                events.push(ProgressEvent::new(ProgressPhase::Complete, 100, "Pull complete"));
                events
            };

            for event in script {
                latency(120).await;
                yield Ok(event);
            }

            // Register the pulled image in the fleet.
            let (repository, tag) = match reference.rsplit_once(':') {
                Some((repo, tag)) if !tag.contains('/') => (repo.to_string(), tag.to_string()),
                _ => (reference.clone(), "latest".to_string()),
            };
            let mut state = inner.lock().await;
            if !state
                .images
                .iter()
                .any(|i| i.repository == repository && i.tag == tag)
            {
                state.images.insert(0, seed_image(&repository, &tag, total));
            }
        })
    }

    fn build_image(
        &self,
        spec: BuildSpec,
    ) -> Pin<Box<dyn tokio_stream::Stream<Item = Result<ProgressEvent, CliError>> + Send + '_>>
    {
        let inner = self.inner.clone();
        Box::pin(async_stream::stream! {
            let total_steps = 4u32;
            for step in 1..=total_steps {
                latency(150).await;
                let mut ev = ProgressEvent::new(
                    ProgressPhase::Extracting,
                    ((step as f64 / total_steps as f64) * 100.0).round() as u8,
                    format!("Step {}/{}: simulated", step, total_steps),
                );
                ev.step = Some(step);
                ev.total_steps = Some(total_steps);
                yield Ok(ev);
            }
            latency(100).await;
            yield Ok(ProgressEvent::new(
                ProgressPhase::Complete,
                100,
                format!("Successfully built {}", spec.tag),
            ));

            let (repository, tag) = match spec.tag.rsplit_once(':') {
                Some((repo, tag)) if !tag.contains('/') => (repo.to_string(), tag.to_string()),
                _ => (spec.tag.clone(), "latest".to_string()),
            };
            let mut state = inner.lock().await;
            state.images.insert(0, seed_image(&repository, &tag, 16 * 1024 * 1024));
        })
    }

    fn remove_image<'a>(
        &'a self,
        reference: &'a str,
        _force: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>> {
        Box::pin(async move {
            latency(MUTATE_LATENCY_MS).await;
            let mut state = self.inner.lock().await;
            let before = state.images.len();
            state.images.retain(|i| {
                i.id != reference
                    && format!("{}:{}", i.repository, i.tag) != reference
                    && i.repository != reference
            });
            if state.images.len() == before {
                return Err(Self::not_found("image", reference));
            }
            Ok(())
        })
    }

    // ── Volumes ─────────────────────────────────────────────────

    fn list_volumes(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<Volume>, CliError>> + Send + '_>> {
        Box::pin(async move {
            latency(LIST_LATENCY_MS).await;
            Ok(self.inner.lock().await.volumes.clone())
        })
    }

    fn inspect_volume<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Volume, CliError>> + Send + 'a>> {
        Box::pin(async move {
            validate_name(name, "volume")?;
            latency(INSPECT_LATENCY_MS).await;
            let state = self.inner.lock().await;
            state
                .volumes
                .iter()
                .find(|v| v.name == name)
                .cloned()
                .ok_or_else(|| Self::not_found("volume", name))
        })
    }

    fn create_volume<'a>(
        &'a self,
        name: &'a str,
        driver: Option<&'a str>,
        labels: HashMap<String, String>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Volume, CliError>> + Send + 'a>> {
        Box::pin(async move {
            validate_name(name, "volume")?;
            latency(MUTATE_LATENCY_MS).await;
            let mut state = self.inner.lock().await;
            if state.volumes.iter().any(|v| v.name == name) {
                return Err(CliError::AlreadyExists {
                    stderr: format!("volume {} already exists", name),
                });
            }
            let mut volume = seed_volume(name);
            if let Some(driver) = driver {
                volume.driver = driver.to_string();
            }
            volume.labels = labels;
            state.volumes.push(volume.clone());
            Ok(volume)
        })
    }

    fn remove_volume<'a>(
        &'a self,
        name: &'a str,
        _force: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>> {
        Box::pin(async move {
            latency(MUTATE_LATENCY_MS).await;
            let mut state = self.inner.lock().await;
            let before = state.volumes.len();
            state.volumes.retain(|v| v.name != name);
            if state.volumes.len() == before {
                return Err(Self::not_found("volume", name));
            }
            Ok(())
        })
    }

    // ── Networks ────────────────────────────────────────────────

    fn list_networks(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<Network>, CliError>> + Send + '_>> {
        Box::pin(async move {
            latency(LIST_LATENCY_MS).await;
            Ok(self.inner.lock().await.networks.clone())
        })
    }

    fn inspect_network<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Network, CliError>> + Send + 'a>> {
        Box::pin(async move {
            validate_name(name, "network")?;
            latency(INSPECT_LATENCY_MS).await;
            let state = self.inner.lock().await;
            state
                .networks
                .iter()
                .find(|n| n.name == name || n.id == name)
                .cloned()
                .ok_or_else(|| Self::not_found("network", name))
        })
    }

    fn create_network<'a>(
        &'a self,
        name: &'a str,
        subnet: Option<&'a str>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Network, CliError>> + Send + 'a>> {
        Box::pin(async move {
            validate_name(name, "network")?;
            latency(MUTATE_LATENCY_MS).await;
            let mut state = self.inner.lock().await;
            if state.networks.iter().any(|n| n.name == name) {
                return Err(CliError::AlreadyExists {
                    stderr: format!("network {} already exists", name),
                });
            }
            let network = seed_network(name, subnet.unwrap_or("192.168.66.0/24"));
            state.networks.push(network.clone());
            Ok(network)
        })
    }

    fn remove_network<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>> {
        Box::pin(async move {
            latency(MUTATE_LATENCY_MS).await;
            let mut state = self.inner.lock().await;
            let before = state.networks.len();
            state.networks.retain(|n| n.name != name && n.id != name);
            if state.networks.len() == before {
                return Err(Self::not_found("network", name));
            }
            Ok(())
        })
    }

    fn connect_network<'a>(
        &'a self,
        network: &'a str,
        container: &'a str,
        _opts: ConnectOpts,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>> {
        Box::pin(async move {
            latency(MUTATE_LATENCY_MS).await;
            let mut state = self.inner.lock().await;
            if !state.networks.iter().any(|n| n.name == network || n.id == network) {
                return Err(Self::not_found("network", network));
            }
            match state
                .containers
                .iter_mut()
                .find(|c| c.id == container || c.name == container)
            {
                Some(c) => {
                    c.network = Some(network.to_string());
                    Ok(())
                }
                None => Err(Self::not_found("container", container)),
            }
        })
    }

    fn disconnect_network<'a>(
        &'a self,
        network: &'a str,
        container: &'a str,
        force: bool,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), CliError>> + Send + 'a>> {
        Box::pin(async move {
            latency(MUTATE_LATENCY_MS).await;
            let mut state = self.inner.lock().await;
            match state
                .containers
                .iter_mut()
                .find(|c| c.id == container || c.name == container)
            {
                Some(c) => {
                    if c.network.as_deref() == Some(network) {
                        c.network = None;
                        Ok(())
                    } else if force {
                        Ok(())
                    } else {
                        Err(Self::not_found("network attachment", network))
                    }
                }
                None => Err(Self::not_found("container", container)),
            }
        })
    }

    // ── System ──────────────────────────────────────────────────

    fn ping(&self) -> Pin<Box<dyn std::future::Future<Output = bool> + Send + '_>> {
        Box::pin(async { true })
    }

    fn binary_path(&self) -> Option<std::path::PathBuf> {
        None
    }

    fn version(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String, CliError>> + Send + '_>> {
        Box::pin(async {
            latency(INSPECT_LATENCY_MS).await;
            Ok("container 0.4.0 (simulated)".to_string())
        })
    }

    fn system_counts(
        &self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<SystemCounts, CliError>> + Send + '_>>
    {
        Box::pin(async move {
            latency(LIST_LATENCY_MS).await;
            let state = self.inner.lock().await;
            Ok(SystemCounts {
                containers: state.containers.len(),
                running: state
                    .containers
                    .iter()
                    .filter(|c| c.status == ContainerStatus::Running)
                    .count(),
                images: state.images.len(),
                volumes: state.volumes.len(),
                networks: state.networks.len(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test(start_paused = true)]
    async fn seeded_fleet_counts() {
        let sim = SimRuntime::seeded();
        let counts = sim.system_counts().await.unwrap();
        assert_eq!(counts.containers, 3);
        assert_eq!(counts.running, 2);
        assert_eq!(counts.images, 4);
        assert_eq!(counts.volumes, 2);
        assert_eq!(counts.networks, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn list_hides_stopped_without_all() {
        let sim = SimRuntime::seeded();
        assert_eq!(sim.list_containers(false).await.unwrap().len(), 2);
        assert_eq!(sim.list_containers(true).await.unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_stop_start_remove() {
        let sim = SimRuntime::seeded();

        sim.stop_container("web", None).await.unwrap();
        assert_eq!(
            sim.inspect_container("web").await.unwrap().status,
            ContainerStatus::Stopped
        );

        sim.start_container("web").await.unwrap();
        assert_eq!(
            sim.inspect_container("web").await.unwrap().status,
            ContainerStatus::Running
        );

        // Removing a running container without force is refused.
        assert!(sim.remove_container("web", false).await.is_err());
        sim.remove_container("web", true).await.unwrap();
        assert!(sim.inspect_container("web").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_passes_through_restarting_state() {
        let sim = SimRuntime::seeded();
        sim.restart_container("web", None).await.unwrap();
        assert_eq!(
            sim.inspect_container("web").await.unwrap().status,
            ContainerStatus::Restarting
        );

        tokio::time::sleep(Duration::from_millis(RESTART_SETTLE_MS * 2)).await;
        assert_eq!(
            sim.inspect_container("web").await.unwrap().status,
            ContainerStatus::Running
        );
    }

    #[tokio::test(start_paused = true)]
    async fn run_prepends_new_container() {
        let sim = SimRuntime::seeded();
        let id = sim
            .run_container(RunSpec {
                image: "alpine:latest".to_string(),
                name: Some("scratch".to_string()),
                auto_start: true,
                ..RunSpec::default()
            })
            .await
            .unwrap();
        assert_eq!(id, "scratch");

        let containers = sim.list_containers(true).await.unwrap();
        assert_eq!(containers[0].name, "scratch");
        assert_eq!(containers[0].status, ContainerStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn run_without_auto_start_creates_stopped() {
        let sim = SimRuntime::seeded();
        sim.run_container(RunSpec {
            image: "alpine:latest".to_string(),
            name: Some("prepared".to_string()),
            auto_start: false,
            ..RunSpec::default()
        })
        .await
        .unwrap();
        assert_eq!(
            sim.inspect_container("prepared").await.unwrap().status,
            ContainerStatus::Stopped
        );
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_name_is_already_exists() {
        let sim = SimRuntime::seeded();
        let err = sim
            .run_container(RunSpec {
                image: "nginx:latest".to_string(),
                name: Some("web".to_string()),
                auto_start: true,
                ..RunSpec::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::AlreadyExists { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn pull_script_ends_complete_and_registers_image() {
        let sim = SimRuntime::seeded();
        let events: Vec<_> = sim.pull_image("busybox:1.36").collect().await;

        let phases: Vec<_> = events
            .iter()
            .map(|e| e.as_ref().unwrap().phase)
            .collect();
        assert_eq!(phases.first(), Some(&ProgressPhase::Resolving));
        assert_eq!(phases.last(), Some(&ProgressPhase::Complete));
        assert!(phases.contains(&ProgressPhase::Downloading));
        assert!(phases.contains(&ProgressPhase::Verifying));

        // Percent never leaves [0, 100] in the scripted sequence.
        assert!(events.iter().all(|e| e.as_ref().unwrap().percent <= 100));

        assert!(sim.inspect_image("busybox:1.36").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn build_script_steps_then_success() {
        let sim = SimRuntime::seeded();
        let spec = BuildSpec {
            context_dir: ".".to_string(),
            tag: "acme/api:dev".to_string(),
            dockerfile: None,
        };
        let events: Vec<_> = sim.build_image(spec).collect().await;
        let last = events.last().unwrap().as_ref().unwrap();
        assert_eq!(last.phase, ProgressPhase::Complete);

        let step_events: Vec<_> = events
            .iter()
            .filter_map(|e| e.as_ref().unwrap().step)
            .collect();
        assert_eq!(step_events, [1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn volume_and_network_crud() {
        let sim = SimRuntime::seeded();

        let vol = sim
            .create_volume("scratch", None, HashMap::new())
            .await
            .unwrap();
        assert_eq!(vol.driver, "local");
        assert!(matches!(
            sim.create_volume("scratch", None, HashMap::new())
                .await
                .unwrap_err(),
            CliError::AlreadyExists { .. }
        ));
        sim.remove_volume("scratch", false).await.unwrap();
        assert!(sim.inspect_volume("scratch").await.is_err());

        let net = sim.create_network("edge", Some("10.1.0.0/16")).await.unwrap();
        assert_eq!(net.subnet.as_deref(), Some("10.1.0.0/16"));
        sim.connect_network("edge", "web", ConnectOpts::default())
            .await
            .unwrap();
        assert_eq!(
            sim.inspect_container("web").await.unwrap().network.as_deref(),
            Some("edge")
        );
        sim.disconnect_network("edge", "web", false).await.unwrap();
        assert_eq!(sim.inspect_container("web").await.unwrap().network, None);
        sim.remove_network("edge").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn log_stream_backlog_then_exit() {
        let sim = SimRuntime::seeded();
        let mut handle = sim.stream_logs("web", Some(2), false).await.unwrap();

        let mut lines = 0;
        let mut exited = false;
        while let Some(event) = handle.recv().await {
            match event {
                StreamEvent::Output { .. } => lines += 1,
                StreamEvent::Exit { code } => {
                    assert_eq!(code, Some(0));
                    exited = true;
                    break;
                }
                StreamEvent::Error { message } => panic!("unexpected error: {}", message),
            }
        }
        assert_eq!(lines, 2);
        assert!(exited);
    }

    #[tokio::test(start_paused = true)]
    async fn follow_stream_stops_on_cancel() {
        let sim = SimRuntime::seeded();
        let mut handle = sim.stream_logs("web", Some(1), true).await.unwrap();

        // Backlog line arrives, then cancel ends the stream.
        assert!(matches!(
            handle.recv().await,
            Some(StreamEvent::Output { .. })
        ));
        handle.cancel();
        loop {
            match handle.recv().await {
                None => break,
                Some(StreamEvent::Output { .. }) => continue, // races with cancel
                Some(other) => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exec_echoes_input() {
        let sim = SimRuntime::seeded();
        let mut handle = sim.open_exec("web", vec!["/bin/sh".to_string()]).await.unwrap();
        let control = handle.control();

        control
            .send(ExecControl::Input(Bytes::from_static(b"ls\n")))
            .await
            .unwrap();
        match handle.recv().await.unwrap() {
            StreamEvent::Output { data, .. } => assert_eq!(&data[..], b"ls\n"),
            other => panic!("unexpected event: {:?}", other),
        }

        control.send(ExecControl::Close).await.unwrap();
        assert!(handle.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stats_zero_for_stopped_container() {
        let sim = SimRuntime::seeded();
        let stats = sim.container_stats("cache").await.unwrap();
        assert_eq!(stats.cpu_percent, 0.0);
        assert_eq!(stats.memory_usage, 0);

        let running = sim.container_stats("web").await.unwrap();
        assert!(running.cpu_percent > 0.0);
    }
}
