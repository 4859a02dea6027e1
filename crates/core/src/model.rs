//! Canonical data model — the stable shapes every backend resolves to.
//!
//! Raw CLI output comes in two schema generations (see `parser::records`);
//! everything above the parser only ever sees these types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Closed container status enum. Parsing never produces anything outside
/// this set; unrecognized raw states map to [`ContainerStatus::Stopped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Running,
    Stopped,
    Error,
    Paused,
    Restarting,
}

impl ContainerStatus {
    /// Map a raw state string to the closed enum. The CLI has grown several
    /// spellings over time ("exited", "stopped", "created"); anything we do
    /// not recognize is treated as stopped rather than invented.
    pub fn from_raw(raw: &str) -> Self {
        let lower = raw.trim().to_ascii_lowercase();
        match lower.as_str() {
            "running" => Self::Running,
            "paused" => Self::Paused,
            "restarting" => Self::Restarting,
            "error" | "dead" => Self::Error,
            // Legacy list output reports "Up 2 hours" instead of a state word.
            _ if lower.starts_with("up") => Self::Running,
            _ => Self::Stopped,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Error => "error",
            Self::Paused => "paused",
            Self::Restarting => "restarting",
        }
    }
}

/// A published port mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub host_port: u16,
    pub container_port: u16,
    pub protocol: String,
}

/// A bind mount or volume attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPoint {
    pub source: String,
    pub target: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: ContainerStatus,
    /// Unix seconds. 0 when the record carried no timestamp.
    pub created_at: i64,
    pub ports: Vec<PortMapping>,
    pub mounts: Vec<MountPoint>,
    pub env: Vec<String>,
    pub labels: HashMap<String, String>,
    pub command: Option<Vec<String>>,
    pub network: Option<String>,
}

/// One stats snapshot, reconciled from either raw schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerStats {
    pub container_id: String,
    pub cpu_percent: f64,
    pub memory_usage: u64,
    pub memory_limit: u64,
    pub network_rx: u64,
    pub network_tx: u64,
    pub block_read: u64,
    pub block_write: u64,
    /// Unix seconds at which the snapshot was taken.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub repository: String,
    pub tag: String,
    pub created_at: i64,
    /// Size in bytes.
    pub size: u64,
    pub labels: HashMap<String, String>,
    pub digest: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    pub driver: String,
    pub mountpoint: String,
    pub created_at: i64,
    pub labels: HashMap<String, String>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    pub name: String,
    pub driver: String,
    pub created_at: i64,
    pub subnet: Option<String>,
    pub gateway: Option<String>,
    pub labels: HashMap<String, String>,
    pub internal: bool,
    pub state: Option<String>,
    pub ipv6_subnet: Option<String>,
}

/// One stage of a pull/build timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPhase {
    Resolving,
    Downloading,
    Extracting,
    Verifying,
    Complete,
    Error,
}

impl ProgressPhase {
    /// Fallback percent used when a line names a phase but carries no
    /// measurable progress.
    pub fn fallback_percent(&self) -> u8 {
        match self {
            Self::Resolving => 5,
            Self::Downloading => 30,
            Self::Extracting => 70,
            Self::Verifying => 90,
            Self::Complete => 100,
            Self::Error => 0,
        }
    }
}

/// One classified line of pull/build output. No persisted identity; events
/// are emitted in the order the underlying process writes lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    /// Always within [0, 100].
    pub percent: u8,
    pub message: String,
    pub current: Option<u64>,
    pub total: Option<u64>,
    pub layer_id: Option<String>,
    pub step: Option<u32>,
    pub total_steps: Option<u32>,
}

impl ProgressEvent {
    pub fn new(phase: ProgressPhase, percent: u8, message: impl Into<String>) -> Self {
        Self {
            phase,
            percent: percent.min(100),
            message: message.into(),
            current: None,
            total: None,
            layer_id: None,
            step: None,
            total_steps: None,
        }
    }
}

/// Aggregate counts for the console's system header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemCounts {
    pub containers: usize,
    pub running: usize,
    pub images: usize,
    pub volumes: usize,
    pub networks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_known_states() {
        assert_eq!(ContainerStatus::from_raw("running"), ContainerStatus::Running);
        assert_eq!(ContainerStatus::from_raw("Paused"), ContainerStatus::Paused);
        assert_eq!(ContainerStatus::from_raw("restarting"), ContainerStatus::Restarting);
        assert_eq!(ContainerStatus::from_raw("dead"), ContainerStatus::Error);
        assert_eq!(ContainerStatus::from_raw("exited"), ContainerStatus::Stopped);
    }

    #[test]
    fn status_unknown_defaults_to_stopped() {
        assert_eq!(ContainerStatus::from_raw("hibernating"), ContainerStatus::Stopped);
        assert_eq!(ContainerStatus::from_raw(""), ContainerStatus::Stopped);
    }

    #[test]
    fn progress_event_clamps_percent() {
        let ev = ProgressEvent::new(ProgressPhase::Downloading, 250, "x");
        assert_eq!(ev.percent, 100);
    }

    #[test]
    fn fallback_percent_table() {
        assert_eq!(ProgressPhase::Resolving.fallback_percent(), 5);
        assert_eq!(ProgressPhase::Downloading.fallback_percent(), 30);
        assert_eq!(ProgressPhase::Extracting.fallback_percent(), 70);
        assert_eq!(ProgressPhase::Verifying.fallback_percent(), 90);
        assert_eq!(ProgressPhase::Complete.fallback_percent(), 100);
        assert_eq!(ProgressPhase::Error.fallback_percent(), 0);
    }
}
