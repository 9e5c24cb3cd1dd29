//! Configuration loading.
//!
//! Loads engine configuration from `./unichat.toml` (or
//! `$UNICHAT_CONFIG_PATH`). Environment variables override file values;
//! file values override defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

// ── Top-level config ────────────────────────────────────────────

/// Top-level configuration loaded from TOML.
///
/// Path: `./unichat.toml` or `$UNICHAT_CONFIG_PATH`.
/// Precedence: env vars > config file > defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UnichatConfig {
    /// Engine core settings (`[engine]`).
    pub engine: EngineConfig,
    /// Filesystem paths for persistent state (`[paths]`).
    pub paths: PathsConfig,
}

impl UnichatConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// If the config file does not exist, defaults are used.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_from_file() -> Result<Self> {
        let path = Self::config_path_with(|key| std::env::var(key).ok());
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                let config: UnichatConfig =
                    toml::from_str(&contents).context("failed to parse config TOML")?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                Ok(UnichatConfig::default())
            }
            Err(e) => Err(anyhow::anyhow!("failed to read config file: {e}")),
        }
    }

    /// Resolve config path using a custom env resolver (for testing).
    fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("UNICHAT_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("unichat.toml"))
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability (avoids unsafe `set_var`
    /// in tests).
    fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("UNICHAT_LOG_LEVEL") {
            self.engine.log_level = v;
        }
        if let Some(v) = env("UNICHAT_SHUTDOWN_TIMEOUT_SECS") {
            match v.parse() {
                Ok(n) => self.engine.shutdown_timeout_seconds = n,
                Err(_) => tracing::warn!(
                    var = "UNICHAT_SHUTDOWN_TIMEOUT_SECS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("UNICHAT_SETTINGS_FILE") {
            self.paths.settings_file = Some(v);
        }
        if let Some(v) = env("UNICHAT_LOGS_DIR") {
            self.paths.logs_dir = v;
        }
    }

    /// Parse a TOML string into config (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: UnichatConfig =
            toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }

    /// Resolve the settings file path, falling back to the per-user
    /// default location.
    pub fn settings_path(&self) -> PathBuf {
        self.paths
            .settings_file
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(crate::settings::JsonFileStore::default_path)
    }
}

// ── Engine config ───────────────────────────────────────────────

/// Engine core settings (`[engine]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tracing log level filter.
    pub log_level: String,
    /// Graceful shutdown timeout in seconds.
    pub shutdown_timeout_seconds: u64,
    /// Capacity of the adapter event channel.
    pub channel_buffer_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            shutdown_timeout_seconds: 30,
            channel_buffer_size: crate::engine::DEFAULT_EVENT_BUFFER,
        }
    }
}

// ── Paths config ────────────────────────────────────────────────

/// Filesystem paths for persistent state (`[paths]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Settings JSON file path. Falls back to the per-user config
    /// directory when unset.
    pub settings_file: Option<String>,
    /// Directory for rolling log files.
    pub logs_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            settings_file: None,
            logs_dir: "logs".to_string(),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────
