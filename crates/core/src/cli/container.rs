//! Container domain — lifecycle, stats, log and exec streaming.
//!
//! Argv construction is split into pure builder functions so tests can
//! assert the exact vectors the CLI receives.

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cli::client::{CliClient, CliError};
use crate::client::ops::RunSpec;
use crate::client::stream::{
    ExecControl, ExecHandle, OutputSource, StreamEvent, StreamHandle, STREAM_CHANNEL_CAPACITY,
};
use crate::config::CoreConfig;
use crate::model::{Container, ContainerStats};
use crate::parser::records::{parse_container_inspect, parse_container_list};
use crate::parser::stats::parse_container_stats;
use crate::validate::{
    validate_container_id, validate_env_vars, validate_image_ref, validate_name,
    validate_port_mapping, validate_volume_mount,
};

// ── Argv builders ───────────────────────────────────────────────

pub(crate) fn list_args(all: bool) -> Vec<String> {
    let mut args = vec!["list".to_string(), "--format".to_string(), "json".to_string()];
    if all {
        args.push("-a".to_string());
    }
    args
}

/// Flags shared by `run` and `create`, in fixed order: name, network,
/// ports, volumes, env (sorted), labels (sorted).
fn spawn_flags(spec: &RunSpec, args: &mut Vec<String>) {
    if let Some(name) = &spec.name {
        args.push("--name".to_string());
        args.push(name.clone());
    }
    if let Some(network) = &spec.network {
        args.push("--network".to_string());
        args.push(network.clone());
    }
    for port in &spec.ports {
        args.push("-p".to_string());
        args.push(port.clone());
    }
    for volume in &spec.volumes {
        args.push("-v".to_string());
        args.push(volume.clone());
    }
    for entry in CoreConfig::env_to_vec(&spec.env) {
        args.push("-e".to_string());
        args.push(entry);
    }
    let mut labels: Vec<_> = spec.labels.iter().collect();
    labels.sort();
    for (key, value) in labels {
        args.push("--label".to_string());
        args.push(format!("{}={}", key, value));
    }
}

pub(crate) fn run_args(spec: &RunSpec) -> Vec<String> {
    let mut args = vec!["run".to_string()];
    if spec.detach {
        args.push("-d".to_string());
    }
    if spec.remove_on_exit {
        args.push("--rm".to_string());
    }
    spawn_flags(spec, &mut args);
    args.push(spec.image.clone());
    args.extend(spec.command.iter().cloned());
    args
}

pub(crate) fn create_args(spec: &RunSpec) -> Vec<String> {
    let mut args = vec!["create".to_string()];
    spawn_flags(spec, &mut args);
    args.push(spec.image.clone());
    args.extend(spec.command.iter().cloned());
    args
}

pub(crate) fn stop_args(id: &str, timeout_secs: Option<u32>) -> Vec<String> {
    let mut args = vec!["stop".to_string()];
    if let Some(t) = timeout_secs {
        args.push("-t".to_string());
        args.push(t.to_string());
    }
    args.push(id.to_string());
    args
}

pub(crate) fn start_args(id: &str) -> Vec<String> {
    vec!["start".to_string(), id.to_string()]
}

pub(crate) fn remove_args(id: &str, force: bool) -> Vec<String> {
    let mut args = vec!["rm".to_string()];
    if force {
        args.push("-f".to_string());
    }
    args.push(id.to_string());
    args
}

pub(crate) fn inspect_args(id: &str) -> Vec<String> {
    vec!["inspect".to_string(), id.to_string()]
}

pub(crate) fn stats_args(id: &str) -> Vec<String> {
    vec![
        "stats".to_string(),
        "--no-stream".to_string(),
        "--format".to_string(),
        "json".to_string(),
        id.to_string(),
    ]
}

pub(crate) fn logs_args(id: &str, tail: Option<u32>, follow: bool) -> Vec<String> {
    let mut args = vec!["logs".to_string()];
    if let Some(n) = tail {
        args.push("-n".to_string());
        args.push(n.to_string());
    }
    if follow {
        args.push("-f".to_string());
    }
    args.push(id.to_string());
    args
}

pub(crate) fn exec_args(id: &str, command: &[String]) -> Vec<String> {
    let mut args = vec!["exec".to_string(), "-i".to_string(), "-t".to_string(), id.to_string()];
    args.extend(command.iter().cloned());
    args
}

fn validate_run_spec(spec: &RunSpec) -> Result<(), CliError> {
    validate_image_ref(&spec.image)?;
    if let Some(name) = &spec.name {
        validate_name(name, "container")?;
    }
    if let Some(network) = &spec.network {
        validate_name(network, "network")?;
    }
    for port in &spec.ports {
        validate_port_mapping(port)?;
    }
    for volume in &spec.volumes {
        validate_volume_mount(volume)?;
    }
    validate_env_vars(&spec.env)?;
    Ok(())
}

// ── Operations ──────────────────────────────────────────────────

impl CliClient {
    pub async fn list_containers(&self, all: bool) -> Result<Vec<Container>, CliError> {
        let out = self.exec_default(&list_args(all)).await?;
        parse_container_list(&out)
    }

    pub async fn inspect_container(&self, id: &str) -> Result<Container, CliError> {
        validate_container_id(id)?;
        let out = self.exec_default(&inspect_args(id)).await?;
        parse_container_inspect(&out)
    }

    /// Create (and optionally start) a container; returns the new id.
    ///
    /// With `auto_start` the CLI's `run` is used directly. Without it a
    /// single `create` invocation is issued; if that fails, the original
    /// failure propagates. There is deliberately no `run`+`stop` fallback.
    pub async fn run_container(&self, spec: RunSpec) -> Result<String, CliError> {
        validate_run_spec(&spec)?;
        let args = if spec.auto_start {
            run_args(&spec)
        } else {
            create_args(&spec)
        };
        let out = self.exec_long(&args).await?;
        Ok(out.trim().to_string())
    }

    pub async fn stop_container(&self, id: &str, timeout_secs: Option<u32>) -> Result<(), CliError> {
        validate_container_id(id)?;
        self.exec_default(&stop_args(id, timeout_secs)).await?;
        Ok(())
    }

    pub async fn start_container(&self, id: &str) -> Result<(), CliError> {
        validate_container_id(id)?;
        self.exec_default(&start_args(id)).await?;
        Ok(())
    }

    /// The CLI has no dedicated restart subcommand; restart is a stop
    /// followed by a start, each surfacing its own single attempt.
    pub async fn restart_container(
        &self,
        id: &str,
        timeout_secs: Option<u32>,
    ) -> Result<(), CliError> {
        self.stop_container(id, timeout_secs).await?;
        self.start_container(id).await
    }

    pub async fn remove_container(&self, id: &str, force: bool) -> Result<(), CliError> {
        validate_container_id(id)?;
        self.exec_default(&remove_args(id, force)).await?;
        Ok(())
    }

    pub async fn container_stats(&self, id: &str) -> Result<ContainerStats, CliError> {
        validate_container_id(id)?;
        let out = self.exec_default(&stats_args(id)).await?;
        parse_container_stats(id, &out)
    }

    /// Spawn a log stream. Buffering and flush policy belong to the
    /// session layer; this returns the raw event channel.
    pub async fn stream_logs(
        &self,
        id: &str,
        tail: Option<u32>,
        follow: bool,
    ) -> Result<StreamHandle, CliError> {
        validate_container_id(id)?;
        let child = self.spawn_streaming(&logs_args(id, tail, follow), false)?;
        Ok(stream_from_child(child))
    }

    /// Spawn an interactive exec with a piped stdin.
    pub async fn open_exec(&self, id: &str, command: Vec<String>) -> Result<ExecHandle, CliError> {
        validate_container_id(id)?;
        let child = self.spawn_streaming(&exec_args(id, &command), true)?;
        Ok(exec_from_child(child))
    }
}

// ── Child-process adapters ──────────────────────────────────────

fn spawn_pipe_reader<R>(
    pipe: Option<R>,
    source: OutputSource,
    tx: mpsc::Sender<StreamEvent>,
) -> JoinHandle<()>
where
    R: AsyncReadExt + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(mut pipe) = pipe else { return };
        let mut buf = BytesMut::with_capacity(8192);
        loop {
            match pipe.read_buf(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let data = buf.split().freeze();
                    if tx.send(StreamEvent::Output { source, data }).await.is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Adapt a spawned child into a [`StreamHandle`]: one reader task per pipe,
/// exit/error delivered once after both pipes drain. Cancel kills the child
/// without waiting for exit confirmation.
pub(crate) fn stream_from_child(mut child: Child) -> StreamHandle {
    let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
    let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

    let out_task = spawn_pipe_reader(child.stdout.take(), OutputSource::Stdout, tx.clone());
    let err_task = spawn_pipe_reader(child.stderr.take(), OutputSource::Stderr, tx.clone());

    tokio::spawn(async move {
        tokio::select! {
            _ = &mut cancel_rx => {
                let _ = child.start_kill();
                out_task.abort();
                err_task.abort();
            }
            status = child.wait() => {
                let _ = out_task.await;
                let _ = err_task.await;
                match status {
                    Ok(st) => {
                        let _ = tx.send(StreamEvent::Exit { code: st.code() }).await;
                    }
                    Err(e) => {
                        let _ = tx
                            .send(StreamEvent::Error { message: e.to_string() })
                            .await;
                    }
                }
            }
        }
    });

    StreamHandle::new(rx, cancel_tx)
}

/// Adapt a spawned child into an [`ExecHandle`]: output as with log
/// streams, control messages driving stdin and termination.
pub(crate) fn exec_from_child(mut child: Child) -> ExecHandle {
    let (ev_tx, ev_rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
    let (ctl_tx, mut ctl_rx) = mpsc::channel::<ExecControl>(STREAM_CHANNEL_CAPACITY);

    let out_task = spawn_pipe_reader(child.stdout.take(), OutputSource::Stdout, ev_tx.clone());
    let err_task = spawn_pipe_reader(child.stderr.take(), OutputSource::Stderr, ev_tx.clone());
    let mut stdin = child.stdin.take();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                msg = ctl_rx.recv() => match msg {
                    Some(ExecControl::Input(data)) => {
                        if let Some(stdin) = stdin.as_mut() {
                            if stdin.write_all(&data).await.is_err() {
                                debug!("exec stdin closed; dropping input");
                            }
                        }
                    }
                    Some(ExecControl::Resize { cols, rows }) => {
                        // Pipe transport has no PTY to resize.
                        debug!(cols, rows, "resize ignored for pipe-backed exec");
                    }
                    Some(ExecControl::Close) | None => {
                        let _ = child.start_kill();
                        out_task.abort();
                        err_task.abort();
                        break;
                    }
                },
                status = child.wait() => {
                    let _ = out_task.await;
                    let _ = err_task.await;
                    match status {
                        Ok(st) => {
                            let _ = ev_tx.send(StreamEvent::Exit { code: st.code() }).await;
                        }
                        Err(e) => {
                            let _ = ev_tx
                                .send(StreamEvent::Error { message: e.to_string() })
                                .await;
                        }
                    }
                    break;
                }
            }
        }
    });

    ExecHandle::new(ev_rx, ctl_tx)
}
