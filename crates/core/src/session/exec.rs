//! Interactive exec sessions.
//!
//! Keyed by a generated session id. The owner identity is captured at
//! creation; input, resize, and close requests from any other identity are
//! silently ignored: one UI surface must not be able to hijack another's
//! shell. Ignoring (rather than erroring) keeps a misbehaving caller from
//! probing which session ids exist.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use crate::cli::client::CliError;
use crate::client::ops::RuntimeOps;
use crate::client::stream::{ExecControl, ExecHandle, StreamEvent};
use crate::event::CoreEvent;
use crate::session::{ClientId, SessionManager};

pub(crate) struct ExecSessionEntry {
    pub(crate) generation: u64,
    pub(crate) owner: ClientId,
    pub(crate) control: mpsc::Sender<ExecControl>,
}

/// Default command when the caller does not choose one.
const DEFAULT_SHELL: &str = "/bin/sh";

impl SessionManager {
    /// Start an interactive exec session; returns the generated session id.
    pub async fn start_exec(
        &self,
        runtime: &Arc<dyn RuntimeOps>,
        container_id: &str,
        command: Option<Vec<String>>,
        owner: ClientId,
        sink: mpsc::Sender<CoreEvent>,
    ) -> Result<String, CliError> {
        let command = match command {
            Some(cmd) if !cmd.is_empty() => cmd,
            _ => vec![DEFAULT_SHELL.to_string()],
        };

        let handle = runtime.open_exec(container_id, command).await?;
        let session_id = format!("exec-{}", self.exec_counter.fetch_add(1, Ordering::Relaxed));
        self.attach_exec_stream(&session_id, handle, owner, sink);
        Ok(session_id)
    }

    /// Wire an already-open exec handle into a managed session.
    pub(crate) fn attach_exec_stream(
        &self,
        session_id: &str,
        mut handle: ExecHandle,
        owner: ClientId,
        sink: mpsc::Sender<CoreEvent>,
    ) {
        let generation = self.next_generation();
        self.execs.insert(
            session_id.to_string(),
            ExecSessionEntry {
                generation,
                owner,
                control: handle.control(),
            },
        );

        let registry = Arc::clone(&self.execs);
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            while let Some(event) = handle.recv().await {
                match event {
                    StreamEvent::Output { source, data } => {
                        let sent = sink
                            .send(CoreEvent::ExecOutput {
                                session_id: session_id.clone(),
                                source,
                                data,
                            })
                            .await;
                        if sent.is_err() {
                            break;
                        }
                    }
                    StreamEvent::Exit { code } => {
                        let _ = sink
                            .send(CoreEvent::ExecClosed {
                                session_id: session_id.clone(),
                                exit_code: code,
                            })
                            .await;
                        break;
                    }
                    StreamEvent::Error { message } => {
                        let _ = sink
                            .send(CoreEvent::ExecError {
                                session_id: session_id.clone(),
                                message,
                            })
                            .await;
                        break;
                    }
                }
            }
            registry.remove_if(&session_id, |_, entry| entry.generation == generation);
        });
    }

    /// Forward input to the session's stdin. No-op unless `claimant` is
    /// the recorded owner.
    pub async fn send_exec_input(&self, session_id: &str, claimant: &ClientId, data: Bytes) {
        let Some(control) = self.exec_control_for(session_id, claimant, "input") else {
            return;
        };
        let _ = control.send(ExecControl::Input(data)).await;
    }

    /// Resize the session's terminal. No-op unless `claimant` is the owner.
    pub async fn resize_exec(&self, session_id: &str, claimant: &ClientId, cols: u16, rows: u16) {
        let Some(control) = self.exec_control_for(session_id, claimant, "resize") else {
            return;
        };
        let _ = control.send(ExecControl::Resize { cols, rows }).await;
    }

    /// Terminate the session and remove it. No-op unless `claimant` is the
    /// owner.
    pub async fn close_exec(&self, session_id: &str, claimant: &ClientId) {
        let owned = match self.execs.get(session_id) {
            Some(entry) if entry.owner == *claimant => true,
            Some(_) => {
                debug!(session_id, claimant = claimant.as_str(), "ignoring close from non-owner");
                false
            }
            None => false,
        };
        if !owned {
            return;
        }
        if let Some((_, entry)) = self.execs.remove(session_id) {
            let _ = entry.control.send(ExecControl::Close).await;
        }
    }

    /// Owner-checked lookup of a session's control channel. The guard is
    /// dropped before returning so no DashMap lock is held across awaits.
    fn exec_control_for(
        &self,
        session_id: &str,
        claimant: &ClientId,
        operation: &str,
    ) -> Option<mpsc::Sender<ExecControl>> {
        let entry = self.execs.get(session_id)?;
        if entry.owner != *claimant {
            debug!(
                session_id,
                claimant = claimant.as_str(),
                operation,
                "ignoring request from non-owner"
            );
            return None;
        }
        Some(entry.control.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::stream::{OutputSource, STREAM_CHANNEL_CAPACITY};
    use crate::config::CoreConfig;

    fn raw_exec_handle() -> (
        mpsc::Sender<StreamEvent>,
        mpsc::Receiver<ExecControl>,
        ExecHandle,
    ) {
        let (ev_tx, ev_rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let (ctl_tx, ctl_rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        (ev_tx, ctl_rx, ExecHandle::new(ev_rx, ctl_tx))
    }

    #[tokio::test]
    async fn output_is_tagged_with_session_id() {
        let manager = SessionManager::new(&CoreConfig::default());
        let (ev_tx, _ctl_rx, handle) = raw_exec_handle();
        let (sink, mut events) = mpsc::channel(16);

        manager.attach_exec_stream("exec-7", handle, ClientId::from("win-1"), sink);
        ev_tx
            .send(StreamEvent::Output {
                source: OutputSource::Stdout,
                data: Bytes::from_static(b"$ "),
            })
            .await
            .unwrap();

        match events.recv().await.unwrap() {
            CoreEvent::ExecOutput { session_id, data, .. } => {
                assert_eq!(session_id, "exec-7");
                assert_eq!(&data[..], b"$ ");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn owner_input_is_forwarded() {
        let manager = SessionManager::new(&CoreConfig::default());
        let (_ev_tx, mut ctl_rx, handle) = raw_exec_handle();
        let (sink, _events) = mpsc::channel(16);
        let owner = ClientId::from("win-1");

        manager.attach_exec_stream("exec-1", handle, owner.clone(), sink);
        manager
            .send_exec_input("exec-1", &owner, Bytes::from_static(b"ls\n"))
            .await;

        match ctl_rx.recv().await.unwrap() {
            ExecControl::Input(data) => assert_eq!(&data[..], b"ls\n"),
            other => panic!("unexpected control: {:?}", other),
        }
    }

    #[tokio::test]
    async fn non_owner_requests_are_silently_ignored() {
        let manager = SessionManager::new(&CoreConfig::default());
        let (_ev_tx, mut ctl_rx, handle) = raw_exec_handle();
        let (sink, _events) = mpsc::channel(16);

        manager.attach_exec_stream("exec-1", handle, ClientId::from("win-1"), sink);

        let intruder = ClientId::from("win-2");
        manager
            .send_exec_input("exec-1", &intruder, Bytes::from_static(b"whoami\n"))
            .await;
        manager.resize_exec("exec-1", &intruder, 80, 24).await;
        manager.close_exec("exec-1", &intruder).await;

        // Session is still registered and received no control traffic.
        assert_eq!(manager.active_exec_sessions(), 1);
        assert!(ctl_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn owner_resize_and_close_take_effect() {
        let manager = SessionManager::new(&CoreConfig::default());
        let (_ev_tx, mut ctl_rx, handle) = raw_exec_handle();
        let (sink, _events) = mpsc::channel(16);
        let owner = ClientId::from("win-1");

        manager.attach_exec_stream("exec-1", handle, owner.clone(), sink);
        manager.resize_exec("exec-1", &owner, 120, 40).await;
        match ctl_rx.recv().await.unwrap() {
            ExecControl::Resize { cols, rows } => {
                assert_eq!((cols, rows), (120, 40));
            }
            other => panic!("unexpected control: {:?}", other),
        }

        manager.close_exec("exec-1", &owner).await;
        assert!(matches!(ctl_rx.recv().await.unwrap(), ExecControl::Close));
        assert_eq!(manager.active_exec_sessions(), 0);
    }

    #[tokio::test]
    async fn exit_notifies_and_removes_session() {
        let manager = SessionManager::new(&CoreConfig::default());
        let (ev_tx, _ctl_rx, handle) = raw_exec_handle();
        let (sink, mut events) = mpsc::channel(16);

        manager.attach_exec_stream("exec-1", handle, ClientId::from("win-1"), sink);
        ev_tx.send(StreamEvent::Exit { code: Some(130) }).await.unwrap();

        match events.recv().await.unwrap() {
            CoreEvent::ExecClosed { session_id, exit_code } => {
                assert_eq!(session_id, "exec-1");
                assert_eq!(exit_code, Some(130));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        tokio::task::yield_now().await;
        assert_eq!(manager.active_exec_sessions(), 0);
    }

    #[tokio::test]
    async fn start_exec_defaults_to_shell_against_simulated_backend() {
        use crate::client::fake::SimRuntime;

        let manager = SessionManager::new(&CoreConfig::default());
        let runtime: Arc<dyn RuntimeOps> = Arc::new(SimRuntime::seeded());
        let (sink, mut events) = mpsc::channel(16);
        let owner = ClientId::from("win-1");

        let session_id = manager
            .start_exec(&runtime, "web", None, owner.clone(), sink)
            .await
            .unwrap();
        assert!(session_id.starts_with("exec-"));

        manager
            .send_exec_input(&session_id, &owner, Bytes::from_static(b"uptime\n"))
            .await;
        match events.recv().await.unwrap() {
            CoreEvent::ExecOutput { data, .. } => assert_eq!(&data[..], b"uptime\n"),
            other => panic!("unexpected event: {:?}", other),
        }

        manager.close_exec(&session_id, &owner).await;
        assert_eq!(manager.active_exec_sessions(), 0);
    }

    #[tokio::test]
    async fn shutdown_all_closes_exec_sessions() {
        let manager = SessionManager::new(&CoreConfig::default());
        let (_ev_tx1, mut ctl_rx1, handle1) = raw_exec_handle();
        let (_ev_tx2, mut ctl_rx2, handle2) = raw_exec_handle();
        let (sink1, _e1) = mpsc::channel(16);
        let (sink2, _e2) = mpsc::channel(16);

        manager.attach_exec_stream("exec-1", handle1, ClientId::from("a"), sink1);
        manager.attach_exec_stream("exec-2", handle2, ClientId::from("b"), sink2);
        assert_eq!(manager.active_exec_sessions(), 2);

        manager.shutdown_all().await;
        assert_eq!(manager.active_exec_sessions(), 0);
        assert!(matches!(ctl_rx1.recv().await.unwrap(), ExecControl::Close));
        assert!(matches!(ctl_rx2.recv().await.unwrap(), ExecControl::Close));
    }
}
