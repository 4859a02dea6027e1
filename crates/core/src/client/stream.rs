//! Narrow streaming handles.
//!
//! Backends never hand raw process objects upward. Streaming operations
//! return a read channel plus a cancel signal, so the session layer stays
//! agnostic to whether a real child process or a scripted task sits behind
//! the handle.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

/// Channel depth for streaming output. Enough to absorb bursts without
/// letting a stalled consumer pin unbounded memory.
pub const STREAM_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSource {
    Stdout,
    Stderr,
}

/// One event from a streaming operation.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Output { source: OutputSource, data: Bytes },
    /// The underlying process (or script) finished. Emitted at most once.
    Exit { code: Option<i32> },
    /// The stream broke. Emitted at most once, terminally.
    Error { message: String },
}

/// Read side of a log stream: an event channel and a cancel trigger.
///
/// Cancelling signals the backend to terminate the underlying process; it
/// does not wait for confirmation. Dropping the handle cancels implicitly.
pub struct StreamHandle {
    events: mpsc::Receiver<StreamEvent>,
    cancel: Option<oneshot::Sender<()>>,
}

impl StreamHandle {
    pub fn new(events: mpsc::Receiver<StreamEvent>, cancel: oneshot::Sender<()>) -> Self {
        Self {
            events,
            cancel: Some(cancel),
        }
    }

    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// Signal termination. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Control messages for an interactive exec stream.
#[derive(Debug, Clone)]
pub enum ExecControl {
    Input(Bytes),
    Resize { cols: u16, rows: u16 },
    Close,
}

/// Bidirectional handle for an interactive exec: output events in one
/// direction, control messages in the other.
pub struct ExecHandle {
    events: mpsc::Receiver<StreamEvent>,
    control: mpsc::Sender<ExecControl>,
}

impl ExecHandle {
    pub fn new(events: mpsc::Receiver<StreamEvent>, control: mpsc::Sender<ExecControl>) -> Self {
        Self { events, control }
    }

    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// A clonable sender for control messages; the session layer stores
    /// this in its registry.
    pub fn control(&self) -> mpsc::Sender<ExecControl> {
        self.control.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stream_handle_delivers_in_order() {
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let (cancel_tx, _cancel_rx) = oneshot::channel();
        let mut handle = StreamHandle::new(rx, cancel_tx);

        tx.send(StreamEvent::Output {
            source: OutputSource::Stdout,
            data: Bytes::from_static(b"one"),
        })
        .await
        .unwrap();
        tx.send(StreamEvent::Exit { code: Some(0) }).await.unwrap();
        drop(tx);

        match handle.recv().await.unwrap() {
            StreamEvent::Output { data, .. } => assert_eq!(&data[..], b"one"),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(
            handle.recv().await.unwrap(),
            StreamEvent::Exit { code: Some(0) }
        ));
        assert!(handle.recv().await.is_none());
    }

    #[tokio::test]
    async fn cancel_fires_once_and_on_drop() {
        let (_tx, rx) = mpsc::channel(1);
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let mut handle = StreamHandle::new(rx, cancel_tx);

        handle.cancel();
        handle.cancel(); // second call is a no-op
        assert!(cancel_rx.try_recv().is_ok());

        let (_tx2, rx2) = mpsc::channel(1);
        let (cancel_tx2, mut cancel_rx2) = oneshot::channel::<()>();
        drop(StreamHandle::new(rx2, cancel_tx2));
        assert!(cancel_rx2.try_recv().is_ok());
    }
}
