//! Volume domain — CRUD + inspect.

use std::collections::HashMap;

use crate::cli::client::{argv, CliClient, CliError};
use crate::model::Volume;
use crate::parser::records::{parse_volume_inspect, parse_volume_list};
use crate::validate::validate_name;

// ── Argv builders ───────────────────────────────────────────────

pub(crate) fn volume_list_args() -> Vec<String> {
    argv(&["volume", "list", "--format", "json"])
}

pub(crate) fn volume_inspect_args(name: &str) -> Vec<String> {
    argv(&["volume", "inspect", name])
}

pub(crate) fn volume_create_args(
    name: &str,
    driver: Option<&str>,
    labels: &HashMap<String, String>,
) -> Vec<String> {
    let mut args = argv(&["volume", "create"]);
    if let Some(driver) = driver {
        args.push("--driver".to_string());
        args.push(driver.to_string());
    }
    let mut sorted: Vec<_> = labels.iter().collect();
    sorted.sort();
    for (key, value) in sorted {
        args.push("--label".to_string());
        args.push(format!("{}={}", key, value));
    }
    args.push(name.to_string());
    args
}

pub(crate) fn volume_remove_args(name: &str, force: bool) -> Vec<String> {
    let mut args = argv(&["volume", "rm"]);
    if force {
        args.push("-f".to_string());
    }
    args.push(name.to_string());
    args
}

// ── Operations ──────────────────────────────────────────────────

impl CliClient {
    pub async fn list_volumes(&self) -> Result<Vec<Volume>, CliError> {
        let out = self.exec_default(&volume_list_args()).await?;
        parse_volume_list(&out)
    }

    pub async fn inspect_volume(&self, name: &str) -> Result<Volume, CliError> {
        validate_name(name, "volume")?;
        let out = self.exec_default(&volume_inspect_args(name)).await?;
        parse_volume_inspect(&out)
    }

    /// Create a volume, then inspect it so the caller gets the runtime's
    /// view (driver defaults, mountpoint) rather than an echo of the
    /// request.
    pub async fn create_volume(
        &self,
        name: &str,
        driver: Option<&str>,
        labels: HashMap<String, String>,
    ) -> Result<Volume, CliError> {
        validate_name(name, "volume")?;
        self.exec_default(&volume_create_args(name, driver, &labels))
            .await?;
        self.inspect_volume(name).await
    }

    pub async fn remove_volume(&self, name: &str, force: bool) -> Result<(), CliError> {
        validate_name(name, "volume")?;
        self.exec_default(&volume_remove_args(name, force)).await?;
        Ok(())
    }
}
