//! Log-tail sessions.
//!
//! One active session per container id. Incoming chunks accumulate in a
//! per-session buffer that is flushed to the caller on a fixed tick (or
//! immediately on close), coalescing rapid small writes into one message.
//! A byte ceiling bounds the buffer: logs are a live tail, not an archive,
//! so overflow evicts the oldest content and keeps the newest.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::cli::client::CliError;
use crate::client::ops::RuntimeOps;
use crate::client::stream::{StreamEvent, StreamHandle};
use crate::event::CoreEvent;
use crate::session::SessionManager;

pub(crate) struct LogSessionEntry {
    pub(crate) generation: u64,
    pub(crate) cancel: oneshot::Sender<()>,
}

impl SessionManager {
    /// Open a following log session for a container. An active session for
    /// the same container is torn down first.
    pub async fn subscribe_logs(
        &self,
        runtime: &Arc<dyn RuntimeOps>,
        container_id: &str,
        tail: Option<u32>,
        sink: mpsc::Sender<CoreEvent>,
    ) -> Result<(), CliError> {
        self.unsubscribe_logs(container_id);

        let handle = runtime.stream_logs(container_id, tail, true).await?;
        self.attach_log_stream(container_id, handle, sink);
        Ok(())
    }

    /// Wire an already-open stream handle into a managed session.
    pub(crate) fn attach_log_stream(
        &self,
        container_id: &str,
        handle: StreamHandle,
        sink: mpsc::Sender<CoreEvent>,
    ) {
        let generation = self.next_generation();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.logs.insert(
            container_id.to_string(),
            LogSessionEntry {
                generation,
                cancel: cancel_tx,
            },
        );

        tokio::spawn(run_log_session(
            container_id.to_string(),
            generation,
            handle,
            sink,
            cancel_rx,
            self.flush_interval,
            self.buffer_cap,
            Arc::clone(&self.logs),
        ));
    }

    /// Tear down the log session for a container, if any. Silent: no close
    /// event is delivered for an explicit unsubscribe.
    pub fn unsubscribe_logs(&self, container_id: &str) {
        if let Some((_, entry)) = self.logs.remove(container_id) {
            let _ = entry.cancel.send(());
        }
    }
}

/// Evict from the front until the buffer fits the cap. When the cut lands
/// mid-line, the rest of that line is dropped too so the retained tail
/// starts on a boundary.
fn evict_to_cap(buffer: &mut BytesMut, cap: usize) {
    if buffer.len() <= cap {
        return;
    }
    let excess = buffer.len() - cap;
    let evicted = buffer.split_to(excess);
    if evicted.last() == Some(&b'\n') {
        return;
    }
    if let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
        if pos + 1 < buffer.len() {
            let _ = buffer.split_to(pos + 1);
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_log_session(
    container_id: String,
    generation: u64,
    mut handle: StreamHandle,
    sink: mpsc::Sender<CoreEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
    flush_interval: Duration,
    buffer_cap: usize,
    registry: Arc<DashMap<String, LogSessionEntry>>,
) {
    let mut buffer = BytesMut::new();
    // First flush one interval from now; an immediate tick would race the
    // first chunks and defeat coalescing.
    let mut interval = tokio::time::interval_at(
        tokio::time::Instant::now() + flush_interval,
        flush_interval,
    );
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    // Set on close/error; None means a silent teardown (unsubscribe or
    // dropped sink).
    let mut outcome: Option<CoreEvent> = None;

    loop {
        tokio::select! {
            _ = &mut cancel_rx => {
                handle.cancel();
                break;
            }
            _ = interval.tick() => {
                if !buffer.is_empty() {
                    let chunk = buffer.split().freeze();
                    if sink
                        .send(CoreEvent::LogChunk {
                            container_id: container_id.clone(),
                            data: chunk,
                        })
                        .await
                        .is_err()
                    {
                        // Receiver gone: implicit unsubscribe.
                        debug!(container_id, "log sink dropped; closing session");
                        handle.cancel();
                        break;
                    }
                }
            }
            event = handle.recv() => match event {
                Some(StreamEvent::Output { data, .. }) => {
                    buffer.extend_from_slice(&data);
                    evict_to_cap(&mut buffer, buffer_cap);
                }
                Some(StreamEvent::Exit { code }) => {
                    outcome = Some(CoreEvent::LogClosed {
                        container_id: container_id.clone(),
                        exit_code: code,
                    });
                    break;
                }
                Some(StreamEvent::Error { message }) => {
                    outcome = Some(CoreEvent::LogError {
                        container_id: container_id.clone(),
                        message,
                    });
                    break;
                }
                None => {
                    outcome = Some(CoreEvent::LogClosed {
                        container_id: container_id.clone(),
                        exit_code: None,
                    });
                    break;
                }
            }
        }
    }

    // Flush the remainder and notify exactly once.
    if let Some(event) = outcome {
        if !buffer.is_empty() {
            let _ = sink
                .send(CoreEvent::LogChunk {
                    container_id: container_id.clone(),
                    data: buffer.split().freeze(),
                })
                .await;
        }
        let _ = sink.send(event).await;
    }

    registry.remove_if(&container_id, |_, entry| entry.generation == generation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::stream::{OutputSource, STREAM_CHANNEL_CAPACITY};
    use crate::config::CoreConfig;
    use bytes::Bytes;

    fn manager_with(flush_ms: u64, cap: usize) -> SessionManager {
        SessionManager::new(&CoreConfig {
            log_flush_interval_ms: flush_ms,
            log_buffer_max_bytes: cap,
            ..CoreConfig::default()
        })
    }

    fn raw_handle() -> (mpsc::Sender<StreamEvent>, StreamHandle) {
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let (cancel_tx, _cancel_rx) = oneshot::channel();
        (tx, StreamHandle::new(rx, cancel_tx))
    }

    fn output(data: &'static [u8]) -> StreamEvent {
        StreamEvent::Output {
            source: OutputSource::Stdout,
            data: Bytes::from_static(data),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_chunks_coalesce_into_one_flush() {
        let manager = manager_with(100, 64 * 1024);
        let (tx, handle) = raw_handle();
        let (sink, mut events) = mpsc::channel(16);

        manager.attach_log_stream("web", handle, sink);
        tx.send(output(b"line one\n")).await.unwrap();
        tx.send(output(b"line two\n")).await.unwrap();
        tx.send(output(b"line three\n")).await.unwrap();

        match events.recv().await.unwrap() {
            CoreEvent::LogChunk { container_id, data } => {
                assert_eq!(container_id, "web");
                assert_eq!(&data[..], b"line one\nline two\nline three\n");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn buffer_cap_keeps_most_recent_content() {
        // Cap of 16 bytes; feed five 8-byte lines. Only the newest lines
        // survive to the flush; older content is dropped, not queued.
        let manager = manager_with(100, 16);
        let (tx, handle) = raw_handle();
        let (sink, mut events) = mpsc::channel(16);

        manager.attach_log_stream("web", handle, sink);
        for line in [b"aaaaaaa\n", b"bbbbbbb\n", b"ccccccc\n", b"ddddddd\n", b"eeeeeee\n"] {
            tx.send(output(line)).await.unwrap();
        }

        match events.recv().await.unwrap() {
            CoreEvent::LogChunk { data, .. } => {
                assert_eq!(&data[..], b"ddddddd\neeeeeee\n");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn close_flushes_remainder_and_notifies_once() {
        let manager = manager_with(10_000, 64 * 1024);
        let (tx, handle) = raw_handle();
        let (sink, mut events) = mpsc::channel(16);

        manager.attach_log_stream("web", handle, sink);
        tx.send(output(b"tail\n")).await.unwrap();
        tx.send(StreamEvent::Exit { code: Some(0) }).await.unwrap();
        drop(tx);

        // Flush interval is far away; close forces the flush immediately.
        match events.recv().await.unwrap() {
            CoreEvent::LogChunk { data, .. } => assert_eq!(&data[..], b"tail\n"),
            other => panic!("unexpected event: {:?}", other),
        }
        match events.recv().await.unwrap() {
            CoreEvent::LogClosed { exit_code, .. } => assert_eq!(exit_code, Some(0)),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(events.recv().await.is_none(), "no second notification");

        // The session removed itself from the registry.
        tokio::task::yield_now().await;
        assert_eq!(manager.active_log_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stream_error_is_delivered_once_then_removed() {
        let manager = manager_with(10_000, 64 * 1024);
        let (tx, handle) = raw_handle();
        let (sink, mut events) = mpsc::channel(16);

        manager.attach_log_stream("web", handle, sink);
        tx.send(StreamEvent::Error {
            message: "pipe burst".to_string(),
        })
        .await
        .unwrap();
        drop(tx);

        match events.recv().await.unwrap() {
            CoreEvent::LogError { message, .. } => assert_eq!(message, "pipe burst"),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(events.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn resubscribe_tears_down_previous_session() {
        let manager = manager_with(100, 64 * 1024);
        let (_tx1, handle1) = raw_handle();
        let (sink1, mut events1) = mpsc::channel(16);
        manager.attach_log_stream("web", handle1, sink1);
        assert_eq!(manager.active_log_sessions(), 1);

        manager.unsubscribe_logs("web");
        let (_tx2, handle2) = raw_handle();
        let (sink2, _events2) = mpsc::channel::<CoreEvent>(16);
        manager.attach_log_stream("web", handle2, sink2);

        // Old session ended silently: its sink closes without any event.
        assert!(events1.recv().await.is_none());
        assert_eq!(manager.active_log_sessions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_sink_is_implicit_unsubscribe() {
        let manager = manager_with(100, 64 * 1024);
        let (tx, handle) = raw_handle();
        let (sink, events) = mpsc::channel(16);

        manager.attach_log_stream("web", handle, sink);
        drop(events);
        tx.send(output(b"line\n")).await.unwrap();

        // First flush attempt hits the closed sink and the session ends.
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(manager.active_log_sessions(), 0);
    }

    #[test]
    fn evict_drops_partial_oldest_line() {
        let mut buffer = BytesMut::from(&b"aaaa\nbbbb\ncccc\n"[..]);
        evict_to_cap(&mut buffer, 8);
        assert_eq!(&buffer[..], b"cccc\n");
    }

    #[test]
    fn evict_noop_under_cap() {
        let mut buffer = BytesMut::from(&b"abc\n"[..]);
        evict_to_cap(&mut buffer, 16);
        assert_eq!(&buffer[..], b"abc\n");
    }
}
