use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Environment switch that bypasses CLI discovery entirely and forces the
/// simulated backend.
pub const FORCE_SIMULATED_ENV: &str = "DECKHAND_SIMULATED";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Explicit path to the container CLI binary. When set, discovery is
    /// skipped and the path is used as-is.
    pub cli_path: Option<String>,
    /// Force the simulated backend regardless of CLI availability.
    pub force_simulated: bool,
    /// Timeout for light one-shot commands (list, inspect, stop, ...).
    pub command_timeout_secs: u64,
    /// Timeout for heavy commands (pull, build, run).
    pub long_command_timeout_secs: u64,
    /// Timeout for the `--version` probe during discovery.
    pub probe_timeout_ms: u64,
    /// Log session flush cadence.
    pub log_flush_interval_ms: u64,
    /// Ceiling on a log session's pending buffer; overflow evicts the
    /// oldest bytes.
    pub log_buffer_max_bytes: usize,
    /// Stats polling cadence per container.
    pub stats_poll_interval_ms: u64,
}

impl CoreConfig {
    /// Load configuration from file or environment variables.
    /// Priority: environment variables > config file > defaults.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = std::env::var("DECKHAND_CONFIG_FILE")
            .unwrap_or_else(|_| "/etc/deckhand/core.toml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::info!(
                "Config file not found at {}, using environment variables",
                config_path
            );
            Self::default()
        };

        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: CoreConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Apply environment-variable overrides on top of the current values.
    pub fn apply_env(&mut self) {
        if let Ok(path) = std::env::var("DECKHAND_CLI_PATH") {
            if !path.is_empty() {
                self.cli_path = Some(path);
            }
        }
        if let Ok(forced) = std::env::var(FORCE_SIMULATED_ENV) {
            self.force_simulated = matches!(forced.as_str(), "1" | "true" | "yes");
        }
        if let Some(v) = env_parse("DECKHAND_COMMAND_TIMEOUT_SECS") {
            self.command_timeout_secs = v;
        }
        if let Some(v) = env_parse("DECKHAND_LONG_COMMAND_TIMEOUT_SECS") {
            self.long_command_timeout_secs = v;
        }
        if let Some(v) = env_parse("DECKHAND_LOG_FLUSH_INTERVAL_MS") {
            self.log_flush_interval_ms = v;
        }
        if let Some(v) = env_parse("DECKHAND_LOG_BUFFER_MAX_BYTES") {
            self.log_buffer_max_bytes = v;
        }
        if let Some(v) = env_parse("DECKHAND_STATS_POLL_INTERVAL_MS") {
            self.stats_poll_interval_ms = v;
        }
    }

    /// Validate that configuration values are sane.
    pub fn validate(&self) -> Result<(), String> {
        if self.command_timeout_secs == 0 {
            return Err("command_timeout_secs must be > 0".to_string());
        }
        if self.long_command_timeout_secs < self.command_timeout_secs {
            return Err(
                "long_command_timeout_secs must be >= command_timeout_secs".to_string(),
            );
        }
        if self.probe_timeout_ms == 0 {
            return Err("probe_timeout_ms must be > 0".to_string());
        }
        if self.log_flush_interval_ms == 0 {
            return Err("log_flush_interval_ms must be > 0".to_string());
        }
        if self.log_buffer_max_bytes == 0 {
            return Err("log_buffer_max_bytes must be > 0".to_string());
        }
        if self.stats_poll_interval_ms == 0 {
            return Err("stats_poll_interval_ms must be > 0".to_string());
        }
        if let Some(path) = &self.cli_path {
            if path.is_empty() {
                return Err("cli_path must not be an empty string".to_string());
            }
        }
        Ok(())
    }

    /// Environment map for container spawns, in `K=V` form.
    pub fn env_to_vec(env: &HashMap<String, String>) -> Vec<String> {
        let mut entries: Vec<String> =
            env.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        entries.sort();
        entries
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            cli_path: None,
            force_simulated: false,
            command_timeout_secs: 30,
            long_command_timeout_secs: 600,
            probe_timeout_ms: 2000,
            log_flush_interval_ms: 100,
            log_buffer_max_bytes: 256 * 1024,
            stats_poll_interval_ms: 2000,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.command_timeout_secs, 30);
        assert_eq!(config.log_flush_interval_ms, 100);
        assert!(!config.force_simulated);
    }

    #[test]
    fn validate_rejects_zero_timeouts() {
        let mut config = CoreConfig::default();
        config.command_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = CoreConfig::default();
        config.log_flush_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_timeouts() {
        let mut config = CoreConfig::default();
        config.long_command_timeout_secs = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_cli_path() {
        let mut config = CoreConfig::default();
        config.cli_path = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_toml_partial_overrides() {
        let parsed: CoreConfig =
            toml::from_str("command_timeout_secs = 10\nforce_simulated = true\n").unwrap();
        assert_eq!(parsed.command_timeout_secs, 10);
        assert!(parsed.force_simulated);
        // Untouched fields keep defaults.
        assert_eq!(parsed.long_command_timeout_secs, 600);
    }

    #[test]
    fn env_to_vec_sorted_kv() {
        let mut env = HashMap::new();
        env.insert("B".to_string(), "2".to_string());
        env.insert("A".to_string(), "1".to_string());
        assert_eq!(CoreConfig::env_to_vec(&env), vec!["A=1", "B=2"]);
    }
}
