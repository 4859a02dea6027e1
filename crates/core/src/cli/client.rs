//! CLI client — binary discovery, command execution, error types.
//!
//! Domain methods live in sibling modules (`container`, `image`, `volume`,
//! `network`) which add `impl CliClient` blocks.
//!
//! Every invocation is an explicit argv vector passed to
//! [`tokio::process::Command`]; no shell is ever involved.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::CoreConfig;
use crate::validate::ValidationError;

/// The external binary this backend drives.
pub const CLI_BINARY: &str = "container";

/// Fixed install locations probed before falling back to a PATH lookup.
pub const DEFAULT_INSTALL_PATHS: &[&str] = &[
    "/usr/local/bin/container",
    "/opt/homebrew/bin/container",
    "/usr/bin/container",
];

#[derive(Error, Debug)]
pub enum CliError {
    #[error("container CLI not found: {0}")]
    CliNotFound(String),
    #[error("command timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to parse CLI output: {reason}")]
    Parse { reason: String, raw: String },
    #[error("resource not found: {stderr}")]
    NotFound { stderr: String },
    #[error("already exists: {stderr}")]
    AlreadyExists { stderr: String },
    #[error("permission denied: {stderr}")]
    PermissionDenied { stderr: String },
    #[error("CLI command failed: {stderr}")]
    Unknown { stderr: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Classify a failed invocation from its stderr text.
///
/// The CLI has no machine-readable error channel, so this is substring
/// heuristics by design. The raw stderr rides along for diagnostics.
pub fn classify_stderr(stderr: &str) -> CliError {
    let trimmed = stderr.trim().to_string();
    let lower = trimmed.to_lowercase();

    if lower.contains("not found") || lower.contains("no such") || lower.contains("does not exist")
    {
        CliError::NotFound { stderr: trimmed }
    } else if lower.contains("already exists")
        || lower.contains("already in use")
        || lower.contains("conflict")
    {
        CliError::AlreadyExists { stderr: trimmed }
    } else if lower.contains("permission denied")
        || lower.contains("access denied")
        || lower.contains("operation not permitted")
    {
        CliError::PermissionDenied { stderr: trimmed }
    } else {
        CliError::Unknown { stderr: trimmed }
    }
}

/// Handle to the discovered CLI binary.
///
/// Cheap to clone; the discovered path is fixed for the client's lifetime.
#[derive(Debug, Clone)]
pub struct CliClient {
    binary: PathBuf,
    default_timeout: Duration,
    long_timeout: Duration,
}

impl CliClient {
    /// Build a client for a known binary path, skipping discovery.
    pub fn with_binary(binary: impl Into<PathBuf>, config: &CoreConfig) -> Self {
        Self {
            binary: binary.into(),
            default_timeout: Duration::from_secs(config.command_timeout_secs),
            long_timeout: Duration::from_secs(config.long_command_timeout_secs),
        }
    }

    /// Locate the CLI binary.
    ///
    /// Order: explicitly configured path, the fixed install paths (each
    /// verified with a short-timeout `--version` probe), then a PATH scan.
    /// The result is cached in the returned client for its lifetime.
    pub async fn discover(config: &CoreConfig) -> Result<Self, CliError> {
        let probe_timeout = Duration::from_millis(config.probe_timeout_ms);

        if let Some(configured) = &config.cli_path {
            debug!(path = %configured, "using explicitly configured CLI path");
            return Ok(Self::with_binary(configured, config));
        }

        for candidate in DEFAULT_INSTALL_PATHS {
            let path = Path::new(candidate);
            if path.is_file() && probe(path, probe_timeout).await {
                info!(path = %candidate, "found container CLI at default install path");
                return Ok(Self::with_binary(path, config));
            }
        }

        if let Some(path) = find_in_path() {
            if probe(&path, probe_timeout).await {
                info!(path = %path.display(), "found container CLI on PATH");
                return Ok(Self::with_binary(path, config));
            }
        }

        Err(CliError::CliNotFound(format!(
            "'{}' not found in default install paths or PATH",
            CLI_BINARY
        )))
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary
    }

    pub(crate) fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub(crate) fn long_timeout(&self) -> Duration {
        self.long_timeout
    }

    /// Run one subcommand to completion and return its stdout.
    ///
    /// A timeout kills the child (`kill_on_drop`) and surfaces as
    /// [`CliError::Timeout`]; a non-zero exit is classified from stderr.
    pub(crate) async fn exec(&self, args: &[String], limit: Duration) -> Result<String, CliError> {
        debug!(binary = %self.binary.display(), ?args, "exec");

        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(limit, cmd.output()).await {
            Ok(result) => result.map_err(|e| self.spawn_error(e))?,
            Err(_) => {
                warn!(?args, ?limit, "CLI command timed out");
                return Err(CliError::Timeout(limit));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_stderr(&stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Short-timeout execution for light operations.
    pub(crate) async fn exec_default(&self, args: &[String]) -> Result<String, CliError> {
        self.exec(args, self.default_timeout).await
    }

    /// Long-timeout execution for heavy operations (pull, build, run).
    pub(crate) async fn exec_long(&self, args: &[String]) -> Result<String, CliError> {
        self.exec(args, self.long_timeout).await
    }

    /// Spawn a subcommand for streaming consumption (logs, exec). The
    /// caller owns the child; output buffering and lifecycle belong to the
    /// session layer.
    pub(crate) fn spawn_streaming(
        &self,
        args: &[String],
        piped_stdin: bool,
    ) -> Result<tokio::process::Child, CliError> {
        debug!(binary = %self.binary.display(), ?args, "spawn streaming");

        Command::new(&self.binary)
            .args(args)
            .stdin(if piped_stdin { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))
    }

    /// Query the CLI version string.
    pub async fn version(&self) -> Result<String, CliError> {
        let out = self.exec_default(&["--version".to_string()]).await?;
        Ok(out.trim().to_string())
    }

    fn spawn_error(&self, err: std::io::Error) -> CliError {
        if err.kind() == std::io::ErrorKind::NotFound {
            CliError::CliNotFound(self.binary.display().to_string())
        } else {
            CliError::Unknown {
                stderr: format!("failed to spawn {}: {}", self.binary.display(), err),
            }
        }
    }
}

/// `--version` probe with a short timeout; a hung or broken binary must not
/// stall discovery.
async fn probe(path: &Path, limit: Duration) -> bool {
    let mut cmd = Command::new(path);
    cmd.arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    match tokio::time::timeout(limit, cmd.output()).await {
        Ok(Ok(output)) => output.status.success(),
        _ => false,
    }
}

/// Platform "which"-equivalent: scan PATH for the binary.
fn find_in_path() -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(CLI_BINARY))
        .find(|candidate| candidate.is_file())
}

/// Helper for argv construction: turn a `&str` slice into owned argv.
pub(crate) fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> CoreConfig {
        CoreConfig::default()
    }

    // ── stderr classification ───────────────────────────────────

    #[test]
    fn classify_not_found_variants() {
        assert!(matches!(
            classify_stderr("Error: no such container: web"),
            CliError::NotFound { .. }
        ));
        assert!(matches!(
            classify_stderr("image not found: nginx:nope"),
            CliError::NotFound { .. }
        ));
        assert!(matches!(
            classify_stderr("volume \"data\" does not exist"),
            CliError::NotFound { .. }
        ));
    }

    #[test]
    fn classify_already_exists_variants() {
        assert!(matches!(
            classify_stderr("network with name backend already exists"),
            CliError::AlreadyExists { .. }
        ));
        assert!(matches!(
            classify_stderr("container name \"/web\" is already in use"),
            CliError::AlreadyExists { .. }
        ));
    }

    #[test]
    fn classify_permission_denied() {
        assert!(matches!(
            classify_stderr("dial unix /var/run: permission denied"),
            CliError::PermissionDenied { .. }
        ));
        assert!(matches!(
            classify_stderr("operation not permitted"),
            CliError::PermissionDenied { .. }
        ));
    }

    #[test]
    fn classify_unknown_keeps_raw_stderr() {
        match classify_stderr("  something exploded  ") {
            CliError::Unknown { stderr } => assert_eq!(stderr, "something exploded"),
            other => panic!("expected Unknown, got {:?}", other),
        }
    }

    // ── exec plumbing (stand-in binaries) ───────────────────────

    #[tokio::test]
    async fn exec_captures_stdout() {
        let client = CliClient::with_binary("/bin/echo", &test_config());
        let out = client
            .exec_default(&argv(&["hello", "world"]))
            .await
            .unwrap();
        assert_eq!(out.trim(), "hello world");
    }

    #[tokio::test]
    async fn exec_nonzero_exit_is_classified() {
        let client = CliClient::with_binary("/bin/false", &test_config());
        let err = client.exec_default(&argv(&["x"])).await.unwrap_err();
        assert!(matches!(err, CliError::Unknown { .. }));
    }

    #[tokio::test]
    async fn exec_missing_binary_is_cli_not_found() {
        let client = CliClient::with_binary("/nonexistent/container-cli", &test_config());
        let err = client.exec_default(&argv(&["list"])).await.unwrap_err();
        assert!(matches!(err, CliError::CliNotFound(_)));
    }

    #[tokio::test]
    async fn exec_timeout_kills_and_reports() {
        let client = CliClient::with_binary("/bin/sleep", &test_config());
        let err = client
            .exec(&argv(&["5"]), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Timeout(_)));
    }

    #[tokio::test]
    async fn probe_accepts_exit_zero() {
        assert!(probe(Path::new("/bin/true"), Duration::from_secs(2)).await);
        assert!(!probe(Path::new("/bin/false"), Duration::from_secs(2)).await);
        assert!(!probe(Path::new("/nonexistent/bin"), Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn discover_prefers_configured_path() {
        let config = CoreConfig {
            cli_path: Some("/bin/echo".to_string()),
            ..CoreConfig::default()
        };
        let client = CliClient::discover(&config).await.unwrap();
        assert_eq!(client.binary_path(), Path::new("/bin/echo"));
    }
}
