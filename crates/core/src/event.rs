//! Event surface delivered to the UI layer.
//!
//! Every event is addressed by container id or session id so the consumer
//! can route it to the right view. Session lifecycle events (`*Closed`,
//! `*Error`) are delivered at most once per session.

use bytes::Bytes;

use crate::client::stream::OutputSource;
use crate::model::{ContainerStats, ProgressEvent};

#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// Coalesced log output for one flush tick.
    LogChunk { container_id: String, data: Bytes },
    LogClosed {
        container_id: String,
        exit_code: Option<i32>,
    },
    LogError {
        container_id: String,
        message: String,
    },
    ExecOutput {
        session_id: String,
        source: OutputSource,
        data: Bytes,
    },
    ExecClosed {
        session_id: String,
        exit_code: Option<i32>,
    },
    ExecError {
        session_id: String,
        message: String,
    },
    Stats {
        container_id: String,
        stats: ContainerStats,
    },
    PullProgress {
        reference: String,
        event: ProgressEvent,
    },
    BuildProgress {
        tag: String,
        event: ProgressEvent,
    },
}
