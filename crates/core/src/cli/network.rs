//! Network domain — CRUD, inspect, connect/disconnect.
//!
//! Connect and disconnect argv order is deterministic and asserted by
//! tests: callers depend on the exact vector shape, not just success.

use crate::cli::client::{argv, CliClient, CliError};
use crate::client::ops::ConnectOpts;
use crate::model::Network;
use crate::parser::records::{parse_network_inspect, parse_network_list};
use crate::validate::{validate_container_id, validate_name};

// ── Argv builders ───────────────────────────────────────────────

pub(crate) fn network_list_args() -> Vec<String> {
    argv(&["network", "list", "--format", "json"])
}

pub(crate) fn network_inspect_args(name: &str) -> Vec<String> {
    argv(&["network", "inspect", name])
}

pub(crate) fn network_create_args(name: &str, subnet: Option<&str>) -> Vec<String> {
    let mut args = argv(&["network", "create"]);
    if let Some(subnet) = subnet {
        args.push("--subnet".to_string());
        args.push(subnet.to_string());
    }
    args.push(name.to_string());
    args
}

pub(crate) fn network_remove_args(name: &str) -> Vec<String> {
    argv(&["network", "rm", name])
}

/// Fixed order: `--ip`, then `--alias` with a comma-joined list, then
/// network name, then container id.
pub(crate) fn network_connect_args(
    network: &str,
    container: &str,
    opts: &ConnectOpts,
) -> Vec<String> {
    let mut args = argv(&["network", "connect"]);
    if let Some(ip) = &opts.ip {
        args.push("--ip".to_string());
        args.push(ip.clone());
    }
    if !opts.aliases.is_empty() {
        args.push("--alias".to_string());
        args.push(opts.aliases.join(","));
    }
    args.push(network.to_string());
    args.push(container.to_string());
    args
}

pub(crate) fn network_disconnect_args(network: &str, container: &str, force: bool) -> Vec<String> {
    let mut args = argv(&["network", "disconnect"]);
    if force {
        args.push("--force".to_string());
    }
    args.push(network.to_string());
    args.push(container.to_string());
    args
}

// ── Operations ──────────────────────────────────────────────────

impl CliClient {
    pub async fn list_networks(&self) -> Result<Vec<Network>, CliError> {
        let out = self.exec_default(&network_list_args()).await?;
        parse_network_list(&out)
    }

    pub async fn inspect_network(&self, name: &str) -> Result<Network, CliError> {
        validate_name(name, "network")?;
        let out = self.exec_default(&network_inspect_args(name)).await?;
        parse_network_inspect(&out)
    }

    pub async fn create_network(&self, name: &str, subnet: Option<&str>) -> Result<Network, CliError> {
        validate_name(name, "network")?;
        self.exec_default(&network_create_args(name, subnet)).await?;
        self.inspect_network(name).await
    }

    pub async fn remove_network(&self, name: &str) -> Result<(), CliError> {
        validate_name(name, "network")?;
        self.exec_default(&network_remove_args(name)).await?;
        Ok(())
    }

    pub async fn connect_network(
        &self,
        network: &str,
        container: &str,
        opts: ConnectOpts,
    ) -> Result<(), CliError> {
        validate_name(network, "network")?;
        validate_container_id(container)?;
        self.exec_default(&network_connect_args(network, container, &opts))
            .await?;
        Ok(())
    }

    pub async fn disconnect_network(
        &self,
        network: &str,
        container: &str,
        force: bool,
    ) -> Result<(), CliError> {
        validate_name(network, "network")?;
        validate_container_id(container)?;
        self.exec_default(&network_disconnect_args(network, container, force))
            .await?;
        Ok(())
    }
}
