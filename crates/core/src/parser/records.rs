//! Record decoding — raw CLI JSON to canonical entities.
//!
//! The CLI emits one of two JSON shapes depending on subsystem generation:
//! a "current" shape (nested `configuration`/descriptor objects, timestamps
//! in seconds since 2001-01-01) and a "legacy" shape (flat, capitalized
//! keys, Unix-epoch timestamps). Each record is decoded by attempting the
//! current schema, then the legacy schema, and failing closed with a typed
//! parse error when neither matches.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::cli::client::CliError;
use crate::model::{
    Container, ContainerStatus, Image, MountPoint, Network, PortMapping, Volume,
};
use crate::parser::units::parse_size;

/// Offset from the 2001-01-01 epoch used by the current schema to the Unix
/// epoch.
pub const APPLE_EPOCH_OFFSET: i64 = 978_307_200;

fn apple_to_unix(seconds: f64) -> i64 {
    seconds as i64 + APPLE_EPOCH_OFFSET
}

fn parse_error(kind: &str, raw: &Value) -> CliError {
    CliError::Parse {
        reason: format!("{} record matches neither current nor legacy schema", kind),
        raw: raw.to_string(),
    }
}

fn root_value(raw: &str, kind: &str) -> Result<Value, CliError> {
    serde_json::from_str(raw).map_err(|e| CliError::Parse {
        reason: format!("invalid JSON in {} output: {}", kind, e),
        raw: raw.to_string(),
    })
}

fn expect_array(value: Value, kind: &str) -> Result<Vec<Value>, CliError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(CliError::Parse {
            reason: format!("expected a JSON array of {} records", kind),
            raw: other.to_string(),
        }),
    }
}

/// Split `repository[:tag]` on the last `:`; a missing tag is `latest`.
/// A digest suffix (`@sha256:...`) is peeled off first so the digest's own
/// colon is never mistaken for a tag separator.
fn split_reference(reference: &str) -> (String, String, Option<String>) {
    let (name, digest) = match reference.rsplit_once('@') {
        Some((name, digest)) => (name, Some(digest.to_string())),
        None => (reference, None),
    };
    match name.rsplit_once(':') {
        Some((repo, tag)) => (repo.to_string(), tag.to_string(), digest),
        None => (name.to_string(), "latest".to_string(), digest),
    }
}

// ── Containers ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentContainer {
    configuration: CurrentContainerConfig,
    status: Option<String>,
    created_at: Option<f64>,
    #[serde(default)]
    networks: Vec<CurrentAttachment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentContainerConfig {
    id: String,
    image: Option<CurrentImageRef>,
    labels: Option<HashMap<String, String>>,
    #[serde(default)]
    mounts: Vec<CurrentMount>,
    init_process: Option<CurrentInitProcess>,
    #[serde(default)]
    published_ports: Vec<CurrentPublishedPort>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentImageRef {
    reference: String,
    descriptor: Option<CurrentDescriptor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentDescriptor {
    digest: Option<String>,
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentMount {
    source: Option<String>,
    destination: String,
    #[serde(default)]
    read_only: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentInitProcess {
    #[serde(default)]
    arguments: Vec<String>,
    #[serde(default)]
    environment: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentPublishedPort {
    host_port: u16,
    container_port: u16,
    protocol: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentAttachment {
    network: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyContainer {
    #[serde(rename = "Id", alias = "ID")]
    id: String,
    #[serde(rename = "Names")]
    names: Option<Vec<String>>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Image")]
    image: Option<String>,
    #[serde(rename = "State")]
    state: Option<String>,
    #[serde(rename = "Status")]
    status: Option<String>,
    #[serde(rename = "Created", alias = "CreatedAt")]
    created: Option<i64>,
    #[serde(rename = "Ports", default)]
    ports: Vec<LegacyPort>,
    #[serde(rename = "Mounts", default)]
    mounts: Vec<LegacyMount>,
    #[serde(rename = "Labels")]
    labels: Option<HashMap<String, String>>,
    #[serde(rename = "Command")]
    command: Option<String>,
    #[serde(rename = "Env", default)]
    env: Vec<String>,
    #[serde(rename = "NetworkMode", alias = "Network")]
    network: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyPort {
    #[serde(rename = "PrivatePort")]
    private_port: u16,
    #[serde(rename = "PublicPort")]
    public_port: Option<u16>,
    #[serde(rename = "Type")]
    protocol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyMount {
    #[serde(rename = "Source")]
    source: Option<String>,
    #[serde(rename = "Destination")]
    destination: String,
    #[serde(rename = "RW")]
    rw: Option<bool>,
}

fn container_from_current(rec: CurrentContainer) -> Container {
    let config = rec.configuration;
    let status = rec
        .status
        .as_deref()
        .map(ContainerStatus::from_raw)
        .unwrap_or(ContainerStatus::Stopped);

    let ports = config
        .published_ports
        .into_iter()
        .map(|p| PortMapping {
            host_port: p.host_port,
            container_port: p.container_port,
            protocol: p.protocol.unwrap_or_else(|| "tcp".to_string()),
        })
        .collect();

    let mounts = config
        .mounts
        .into_iter()
        .map(|m| MountPoint {
            source: m.source.unwrap_or_default(),
            target: m.destination,
            read_only: m.read_only,
        })
        .collect();

    let (command, env) = match config.init_process {
        Some(proc) => {
            let command = if proc.arguments.is_empty() {
                None
            } else {
                Some(proc.arguments)
            };
            (command, proc.environment)
        }
        None => (None, Vec::new()),
    };

    Container {
        name: config.id.clone(),
        id: config.id,
        image: config.image.map(|i| i.reference).unwrap_or_default(),
        status,
        created_at: rec.created_at.map(apple_to_unix).unwrap_or(0),
        ports,
        mounts,
        env,
        labels: config.labels.unwrap_or_default(),
        command,
        network: rec.networks.into_iter().find_map(|a| a.network),
    }
}

fn container_from_legacy(rec: LegacyContainer) -> Container {
    let status = match rec.state.as_deref() {
        Some(state) => ContainerStatus::from_raw(state),
        None => rec
            .status
            .as_deref()
            .map(ContainerStatus::from_raw)
            .unwrap_or(ContainerStatus::Stopped),
    };

    let name = rec
        .name
        .or_else(|| rec.names.and_then(|n| n.into_iter().next()))
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_else(|| rec.id.clone());

    let ports = rec
        .ports
        .into_iter()
        .map(|p| PortMapping {
            host_port: p.public_port.unwrap_or(0),
            container_port: p.private_port,
            protocol: p.protocol.unwrap_or_else(|| "tcp".to_string()),
        })
        .collect();

    let mounts = rec
        .mounts
        .into_iter()
        .map(|m| MountPoint {
            source: m.source.unwrap_or_default(),
            target: m.destination,
            read_only: !m.rw.unwrap_or(true),
        })
        .collect();

    let command = rec
        .command
        .map(|c| c.split_whitespace().map(str::to_string).collect::<Vec<_>>())
        .filter(|c| !c.is_empty());

    Container {
        id: rec.id,
        name,
        image: rec.image.unwrap_or_default(),
        status,
        created_at: rec.created.unwrap_or(0),
        ports,
        mounts,
        env: rec.env,
        labels: rec.labels.unwrap_or_default(),
        command,
        network: rec.network,
    }
}

/// Decode one container record, trying the current schema first.
pub fn parse_container_record(value: &Value) -> Result<Container, CliError> {
    if let Ok(rec) = serde_json::from_value::<CurrentContainer>(value.clone()) {
        return Ok(container_from_current(rec));
    }
    if let Ok(rec) = serde_json::from_value::<LegacyContainer>(value.clone()) {
        return Ok(container_from_legacy(rec));
    }
    Err(parse_error("container", value))
}

/// Decode `list --format json` output.
pub fn parse_container_list(raw: &str) -> Result<Vec<Container>, CliError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    expect_array(root_value(raw, "container list")?, "container")?
        .iter()
        .map(parse_container_record)
        .collect()
}

/// Decode `inspect` output: a single record or a one-element array.
pub fn parse_container_inspect(raw: &str) -> Result<Container, CliError> {
    let value = root_value(raw, "container inspect")?;
    match &value {
        Value::Array(items) => parse_container_record(items.first().ok_or_else(|| {
            CliError::Parse {
                reason: "empty container inspect result".to_string(),
                raw: raw.to_string(),
            }
        })?),
        other => parse_container_record(other),
    }
}

// ── Images ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentImage {
    reference: String,
    descriptor: Option<CurrentDescriptor>,
    created_at: Option<f64>,
    labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct LegacyImage {
    #[serde(rename = "Repository")]
    repository: String,
    #[serde(rename = "Tag")]
    tag: Option<String>,
    #[serde(rename = "Id", alias = "ID")]
    id: Option<String>,
    #[serde(rename = "Size")]
    size: Option<Value>,
    #[serde(rename = "Created", alias = "CreatedAt")]
    created: Option<i64>,
    #[serde(rename = "Digest")]
    digest: Option<String>,
    #[serde(rename = "Labels")]
    labels: Option<HashMap<String, String>>,
}

fn image_from_current(rec: CurrentImage) -> Image {
    let (repository, tag, ref_digest) = split_reference(&rec.reference);
    let descriptor = rec.descriptor;
    let digest = descriptor
        .as_ref()
        .and_then(|d| d.digest.clone())
        .or(ref_digest);

    Image {
        id: digest.clone().unwrap_or_else(|| rec.reference.clone()),
        repository,
        tag,
        created_at: rec.created_at.map(apple_to_unix).unwrap_or(0),
        size: descriptor.and_then(|d| d.size).unwrap_or(0),
        labels: rec.labels.unwrap_or_default(),
        digest,
    }
}

fn image_from_legacy(rec: LegacyImage) -> Image {
    let size = match rec.size {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => parse_size(&s),
        _ => 0,
    };

    Image {
        id: rec.id.unwrap_or_else(|| rec.repository.clone()),
        repository: rec.repository,
        tag: rec.tag.unwrap_or_else(|| "latest".to_string()),
        created_at: rec.created.unwrap_or(0),
        size,
        labels: rec.labels.unwrap_or_default(),
        digest: rec.digest,
    }
}

pub fn parse_image_record(value: &Value) -> Result<Image, CliError> {
    if let Ok(rec) = serde_json::from_value::<CurrentImage>(value.clone()) {
        return Ok(image_from_current(rec));
    }
    if let Ok(rec) = serde_json::from_value::<LegacyImage>(value.clone()) {
        return Ok(image_from_legacy(rec));
    }
    Err(parse_error("image", value))
}

pub fn parse_image_list(raw: &str) -> Result<Vec<Image>, CliError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    expect_array(root_value(raw, "image list")?, "image")?
        .iter()
        .map(parse_image_record)
        .collect()
}

pub fn parse_image_inspect(raw: &str) -> Result<Image, CliError> {
    let value = root_value(raw, "image inspect")?;
    match &value {
        Value::Array(items) => parse_image_record(items.first().ok_or_else(|| CliError::Parse {
            reason: "empty image inspect result".to_string(),
            raw: raw.to_string(),
        })?),
        other => parse_image_record(other),
    }
}

// ── Volumes ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentVolume {
    name: String,
    driver: Option<String>,
    #[serde(alias = "source")]
    mountpoint: Option<String>,
    created_at: Option<f64>,
    labels: Option<HashMap<String, String>>,
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LegacyVolume {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Driver")]
    driver: Option<String>,
    #[serde(rename = "Mountpoint")]
    mountpoint: Option<String>,
    #[serde(rename = "Created", alias = "CreatedAt")]
    created: Option<i64>,
    #[serde(rename = "Labels")]
    labels: Option<HashMap<String, String>>,
    #[serde(rename = "Size")]
    size: Option<Value>,
}

fn volume_from_current(rec: CurrentVolume) -> Volume {
    Volume {
        name: rec.name,
        driver: rec.driver.unwrap_or_else(|| "local".to_string()),
        mountpoint: rec.mountpoint.unwrap_or_default(),
        created_at: rec.created_at.map(apple_to_unix).unwrap_or(0),
        labels: rec.labels.unwrap_or_default(),
        size: rec.size,
    }
}

fn volume_from_legacy(rec: LegacyVolume) -> Volume {
    let size = match rec.size {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => match parse_size(&s) {
            0 => None,
            bytes => Some(bytes),
        },
        _ => None,
    };

    Volume {
        name: rec.name,
        driver: rec.driver.unwrap_or_else(|| "local".to_string()),
        mountpoint: rec.mountpoint.unwrap_or_default(),
        created_at: rec.created.unwrap_or(0),
        labels: rec.labels.unwrap_or_default(),
        size,
    }
}

pub fn parse_volume_record(value: &Value) -> Result<Volume, CliError> {
    if let Ok(rec) = serde_json::from_value::<CurrentVolume>(value.clone()) {
        return Ok(volume_from_current(rec));
    }
    if let Ok(rec) = serde_json::from_value::<LegacyVolume>(value.clone()) {
        return Ok(volume_from_legacy(rec));
    }
    Err(parse_error("volume", value))
}

pub fn parse_volume_list(raw: &str) -> Result<Vec<Volume>, CliError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    expect_array(root_value(raw, "volume list")?, "volume")?
        .iter()
        .map(parse_volume_record)
        .collect()
}

pub fn parse_volume_inspect(raw: &str) -> Result<Volume, CliError> {
    let value = root_value(raw, "volume inspect")?;
    match &value {
        Value::Array(items) => parse_volume_record(items.first().ok_or_else(|| CliError::Parse {
            reason: "empty volume inspect result".to_string(),
            raw: raw.to_string(),
        })?),
        other => parse_volume_record(other),
    }
}

// ── Networks ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentNetwork {
    #[serde(alias = "network")]
    name: String,
    id: Option<String>,
    #[serde(alias = "mode")]
    driver: Option<String>,
    state: Option<String>,
    subnet: Option<String>,
    gateway: Option<String>,
    ipv6_subnet: Option<String>,
    created_at: Option<f64>,
    labels: Option<HashMap<String, String>>,
    #[serde(default)]
    internal: bool,
}

#[derive(Debug, Deserialize)]
struct LegacyNetwork {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Id", alias = "ID")]
    id: Option<String>,
    #[serde(rename = "Driver")]
    driver: Option<String>,
    #[serde(rename = "Created", alias = "CreatedAt")]
    created: Option<i64>,
    #[serde(rename = "Internal", default)]
    internal: bool,
    #[serde(rename = "IPAM")]
    ipam: Option<LegacyIpam>,
    #[serde(rename = "Labels")]
    labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct LegacyIpam {
    #[serde(rename = "Config", default)]
    config: Vec<LegacyIpamConfig>,
}

#[derive(Debug, Deserialize)]
struct LegacyIpamConfig {
    #[serde(rename = "Subnet")]
    subnet: Option<String>,
    #[serde(rename = "Gateway")]
    gateway: Option<String>,
}

fn network_from_current(rec: CurrentNetwork) -> Network {
    Network {
        id: rec.id.unwrap_or_else(|| rec.name.clone()),
        name: rec.name,
        driver: rec.driver.unwrap_or_else(|| "nat".to_string()),
        created_at: rec.created_at.map(apple_to_unix).unwrap_or(0),
        subnet: rec.subnet,
        gateway: rec.gateway,
        labels: rec.labels.unwrap_or_default(),
        internal: rec.internal,
        state: rec.state,
        ipv6_subnet: rec.ipv6_subnet,
    }
}

fn network_from_legacy(rec: LegacyNetwork) -> Network {
    let (subnet, gateway) = rec
        .ipam
        .and_then(|i| i.config.into_iter().next())
        .map(|c| (c.subnet, c.gateway))
        .unwrap_or((None, None));

    Network {
        id: rec.id.unwrap_or_else(|| rec.name.clone()),
        name: rec.name,
        driver: rec.driver.unwrap_or_else(|| "bridge".to_string()),
        created_at: rec.created.unwrap_or(0),
        subnet,
        gateway,
        labels: rec.labels.unwrap_or_default(),
        internal: rec.internal,
        state: None,
        ipv6_subnet: None,
    }
}

pub fn parse_network_record(value: &Value) -> Result<Network, CliError> {
    if let Ok(rec) = serde_json::from_value::<CurrentNetwork>(value.clone()) {
        return Ok(network_from_current(rec));
    }
    if let Ok(rec) = serde_json::from_value::<LegacyNetwork>(value.clone()) {
        return Ok(network_from_legacy(rec));
    }
    Err(parse_error("network", value))
}

pub fn parse_network_list(raw: &str) -> Result<Vec<Network>, CliError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    expect_array(root_value(raw, "network list")?, "network")?
        .iter()
        .map(parse_network_record)
        .collect()
}

pub fn parse_network_inspect(raw: &str) -> Result<Network, CliError> {
    let value = root_value(raw, "network inspect")?;
    match &value {
        Value::Array(items) => {
            parse_network_record(items.first().ok_or_else(|| CliError::Parse {
                reason: "empty network inspect result".to_string(),
                raw: raw.to_string(),
            })?)
        }
        other => parse_network_record(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── Containers: current schema ──────────────────────────────

    #[test]
    fn container_current_schema() {
        let raw = json!([{
            "status": "running",
            "createdAt": 776_000_000.0,
            "configuration": {
                "id": "web",
                "image": {
                    "reference": "docker.io/library/nginx:latest",
                    "descriptor": { "digest": "sha256:abc", "size": 1234 }
                },
                "labels": { "app": "frontend" },
                "mounts": [
                    { "source": "/srv/www", "destination": "/usr/share/nginx/html", "readOnly": true }
                ],
                "initProcess": {
                    "arguments": ["nginx", "-g", "daemon off;"],
                    "environment": ["TZ=UTC"]
                },
                "publishedPorts": [
                    { "hostPort": 8080, "containerPort": 80, "protocol": "tcp" }
                ]
            },
            "networks": [ { "network": "default" } ]
        }])
        .to_string();

        let containers = parse_container_list(&raw).unwrap();
        assert_eq!(containers.len(), 1);
        let c = &containers[0];
        assert_eq!(c.id, "web");
        assert_eq!(c.name, "web");
        assert_eq!(c.status, ContainerStatus::Running);
        assert_eq!(c.created_at, 776_000_000 + APPLE_EPOCH_OFFSET);
        assert_eq!(c.image, "docker.io/library/nginx:latest");
        assert_eq!(c.ports[0].host_port, 8080);
        assert!(c.mounts[0].read_only);
        assert_eq!(c.command.as_deref(), Some(["nginx", "-g", "daemon off;"].map(String::from).as_slice()));
        assert_eq!(c.network.as_deref(), Some("default"));
        assert_eq!(c.labels["app"], "frontend");
    }

    #[test]
    fn container_legacy_schema() {
        let raw = json!([{
            "Id": "3f9a",
            "Names": ["/db"],
            "Image": "postgres:16",
            "State": "exited",
            "Status": "Exited (0) 2 hours ago",
            "Created": 1_700_000_000,
            "Ports": [ { "PrivatePort": 5432, "PublicPort": 15432, "Type": "tcp" } ],
            "Mounts": [ { "Source": "/var/db", "Destination": "/var/lib/postgresql/data", "RW": true } ],
            "Labels": { "tier": "data" },
            "Command": "postgres -c max_connections=100",
            "NetworkMode": "bridge"
        }])
        .to_string();

        let containers = parse_container_list(&raw).unwrap();
        let c = &containers[0];
        assert_eq!(c.id, "3f9a");
        assert_eq!(c.name, "db");
        assert_eq!(c.status, ContainerStatus::Stopped);
        assert_eq!(c.created_at, 1_700_000_000);
        assert_eq!(c.ports[0].container_port, 5432);
        assert!(!c.mounts[0].read_only);
        assert_eq!(c.command.as_ref().unwrap()[0], "postgres");
        assert_eq!(c.network.as_deref(), Some("bridge"));
    }

    #[test]
    fn container_legacy_up_status_without_state() {
        let raw = json!([{ "Id": "x1", "Status": "Up 2 hours" }]).to_string();
        let containers = parse_container_list(&raw).unwrap();
        assert_eq!(containers[0].status, ContainerStatus::Running);
    }

    #[test]
    fn container_unknown_state_defaults_to_stopped() {
        let raw = json!([{ "Id": "x1", "State": "hibernating" }]).to_string();
        let containers = parse_container_list(&raw).unwrap();
        assert_eq!(containers[0].status, ContainerStatus::Stopped);
    }

    #[test]
    fn container_mixed_schemas_in_one_list() {
        let raw = json!([
            { "configuration": { "id": "a" }, "status": "running" },
            { "Id": "b", "State": "exited" }
        ])
        .to_string();
        let containers = parse_container_list(&raw).unwrap();
        assert_eq!(containers[0].status, ContainerStatus::Running);
        assert_eq!(containers[1].status, ContainerStatus::Stopped);
    }

    #[test]
    fn container_unrecognized_record_fails_closed() {
        let raw = json!([{ "foo": "bar" }]).to_string();
        let err = parse_container_list(&raw).unwrap_err();
        match err {
            CliError::Parse { reason, raw } => {
                assert!(reason.contains("container"));
                assert!(raw.contains("foo"));
            }
            other => panic!("expected Parse, got {:?}", other),
        }
    }

    #[test]
    fn container_list_empty_and_null() {
        assert!(parse_container_list("").unwrap().is_empty());
        assert!(parse_container_list("[]").unwrap().is_empty());
        assert!(parse_container_list("null").unwrap().is_empty());
    }

    #[test]
    fn container_list_malformed_json() {
        let err = parse_container_list("{not json").unwrap_err();
        assert!(matches!(err, CliError::Parse { .. }));
    }

    #[test]
    fn container_inspect_accepts_object_or_array() {
        let obj = json!({ "configuration": { "id": "web" }, "status": "running" }).to_string();
        assert_eq!(parse_container_inspect(&obj).unwrap().id, "web");

        let arr = json!([{ "Id": "abc", "State": "running" }]).to_string();
        assert_eq!(parse_container_inspect(&arr).unwrap().id, "abc");
    }

    // ── Images ──────────────────────────────────────────────────

    #[test]
    fn image_current_schema() {
        let raw = json!([{
            "reference": "ghcr.io/acme/api:v2",
            "descriptor": { "digest": "sha256:deadbeef", "size": 52_428_800 },
            "createdAt": 700_000_000.0
        }])
        .to_string();

        let images = parse_image_list(&raw).unwrap();
        let img = &images[0];
        assert_eq!(img.repository, "ghcr.io/acme/api");
        assert_eq!(img.tag, "v2");
        assert_eq!(img.size, 52_428_800);
        assert_eq!(img.digest.as_deref(), Some("sha256:deadbeef"));
        assert_eq!(img.created_at, 700_000_000 + APPLE_EPOCH_OFFSET);
    }

    #[test]
    fn image_reference_without_tag_defaults_latest() {
        let raw = json!([{ "reference": "nginx" }]).to_string();
        let images = parse_image_list(&raw).unwrap();
        assert_eq!(images[0].repository, "nginx");
        assert_eq!(images[0].tag, "latest");
    }

    #[test]
    fn image_reference_with_digest_keeps_tag_split_clean() {
        let reference = format!("nginx:1.25@sha256:{}", "a".repeat(64));
        let raw = json!([{ "reference": reference }]).to_string();
        let images = parse_image_list(&raw).unwrap();
        assert_eq!(images[0].repository, "nginx");
        assert_eq!(images[0].tag, "1.25");
        assert!(images[0].digest.as_deref().unwrap().starts_with("sha256:"));
    }

    #[test]
    fn image_legacy_schema_with_string_size() {
        let raw = json!([{
            "Repository": "postgres",
            "Tag": "16",
            "ID": "sha256:77aa",
            "Size": "1.2GB",
            "CreatedAt": 1_690_000_000
        }])
        .to_string();

        let images = parse_image_list(&raw).unwrap();
        let img = &images[0];
        assert_eq!(img.repository, "postgres");
        assert_eq!(img.tag, "16");
        assert_eq!(img.size, (1.2 * 1024.0 * 1024.0 * 1024.0_f64).round() as u64);
        assert_eq!(img.created_at, 1_690_000_000);
    }

    #[test]
    fn image_legacy_numeric_size() {
        let raw = json!([{ "Repository": "redis", "Size": 12345 }]).to_string();
        let images = parse_image_list(&raw).unwrap();
        assert_eq!(images[0].size, 12345);
    }

    #[test]
    fn image_unparseable_size_yields_zero() {
        let raw = json!([{ "Repository": "redis", "Size": "N/A" }]).to_string();
        let images = parse_image_list(&raw).unwrap();
        assert_eq!(images[0].size, 0);
    }

    #[test]
    fn image_garbage_fails_closed() {
        let raw = json!([{ "nope": 1 }]).to_string();
        assert!(matches!(
            parse_image_list(&raw).unwrap_err(),
            CliError::Parse { .. }
        ));
    }

    // ── Volumes ─────────────────────────────────────────────────

    #[test]
    fn volume_both_schemas() {
        let raw = json!([
            { "name": "db-data", "driver": "local", "source": "/vols/db-data", "createdAt": 700_000_000.0 },
            { "Name": "cache", "Mountpoint": "/vols/cache", "CreatedAt": 1_700_000_000, "Size": "512 MB" }
        ])
        .to_string();

        let volumes = parse_volume_list(&raw).unwrap();
        assert_eq!(volumes[0].name, "db-data");
        assert_eq!(volumes[0].mountpoint, "/vols/db-data");
        assert_eq!(volumes[0].created_at, 700_000_000 + APPLE_EPOCH_OFFSET);
        assert_eq!(volumes[1].name, "cache");
        assert_eq!(volumes[1].size, Some(512 * 1024 * 1024));
    }

    #[test]
    fn volume_inspect_single_object() {
        let raw = json!({ "name": "db-data" }).to_string();
        assert_eq!(parse_volume_inspect(&raw).unwrap().name, "db-data");
    }

    // ── Networks ────────────────────────────────────────────────

    #[test]
    fn network_current_schema() {
        let raw = json!([{
            "name": "default",
            "id": "net-1",
            "mode": "nat",
            "state": "running",
            "subnet": "192.168.64.0/24",
            "gateway": "192.168.64.1",
            "ipv6Subnet": "fd00::/64",
            "createdAt": 700_000_000.0
        }])
        .to_string();

        let networks = parse_network_list(&raw).unwrap();
        let n = &networks[0];
        assert_eq!(n.name, "default");
        assert_eq!(n.driver, "nat");
        assert_eq!(n.subnet.as_deref(), Some("192.168.64.0/24"));
        assert_eq!(n.gateway.as_deref(), Some("192.168.64.1"));
        assert_eq!(n.state.as_deref(), Some("running"));
        assert_eq!(n.ipv6_subnet.as_deref(), Some("fd00::/64"));
    }

    #[test]
    fn network_legacy_schema_ipam() {
        let raw = json!([{
            "Name": "backend",
            "Id": "deadbeef",
            "Driver": "bridge",
            "Created": 1_700_000_000,
            "Internal": true,
            "IPAM": { "Config": [ { "Subnet": "172.20.0.0/16", "Gateway": "172.20.0.1" } ] }
        }])
        .to_string();

        let networks = parse_network_list(&raw).unwrap();
        let n = &networks[0];
        assert_eq!(n.id, "deadbeef");
        assert!(n.internal);
        assert_eq!(n.subnet.as_deref(), Some("172.20.0.0/16"));
        assert_eq!(n.gateway.as_deref(), Some("172.20.0.1"));
    }

    #[test]
    fn network_inspect_array_form() {
        let raw = json!([{ "Name": "backend" }]).to_string();
        assert_eq!(parse_network_inspect(&raw).unwrap().name, "backend");
    }

    #[test]
    fn network_garbage_fails_closed() {
        assert!(matches!(
            parse_network_inspect("{}").unwrap_err(),
            CliError::Parse { .. }
        ));
    }
}
