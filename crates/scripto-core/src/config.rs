//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/scripto/config.toml)
//! 3. Environment variables (SCRIPTO_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix
const ENV_PREFIX: &str = "SCRIPTO";

/// Default API base path
pub const DEFAULT_API_URL: &str = "http://localhost:8000/v1";

/// Default notification stream endpoint
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws/notifications/";

/// How vote transitions are sent to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteMode {
    /// Four increment/decrement endpoints (like, unlike, downvote, undo-downvote)
    #[default]
    Legacy,
    /// Single idempotent "set my vote" endpoint
    SetVote,
}

impl std::str::FromStr for VoteMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(VoteMode::Legacy),
            "set_vote" | "set-vote" | "setvote" => Ok(VoteMode::SetVote),
            other => anyhow::bail!("Unknown vote mode '{}'. Use 'legacy' or 'set_vote'.", other),
        }
    }
}

impl std::fmt::Display for VoteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteMode::Legacy => write!(f, "legacy"),
            VoteMode::SetVote => write!(f, "set_vote"),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the HTTP API (all endpoints hang off this path)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// WebSocket endpoint for change notifications
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Directory for local files (debug log)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Debounce window for search input, in milliseconds
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,

    /// Per-request timeout in seconds; unset means requests never time out
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Whether the notification stream reconnects after dropping
    #[serde(default = "default_reconnect")]
    pub reconnect: bool,

    /// First reconnect delay, in milliseconds
    #[serde(default = "default_initial_reconnect_delay_ms")]
    pub initial_reconnect_delay_ms: u64,

    /// Upper bound for the reconnect delay, in milliseconds
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,

    /// How votes are sent to the server
    #[serde(default)]
    pub vote_mode: VoteMode,

    /// Log file path (defaults to {data_dir}/debug.log)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ws_url: default_ws_url(),
            data_dir: default_data_dir(),
            search_debounce_ms: default_search_debounce_ms(),
            request_timeout_secs: None,
            reconnect: default_reconnect(),
            initial_reconnect_delay_ms: default_initial_reconnect_delay_ms(),
            max_reconnect_delay_ms: default_max_reconnect_delay_ms(),
            vote_mode: VoteMode::default(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (SCRIPTO_API_URL, SCRIPTO_WS_URL, ...)
    /// 2. Config file (~/.config/scripto/config.toml or SCRIPTO_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit path from the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_path(p),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var(format!("{}_API_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.api_url = val;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_WS_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.ws_url = val;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_SEARCH_DEBOUNCE_MS", ENV_PREFIX)) {
            self.search_debounce_ms = val
                .parse()
                .with_context(|| format!("Invalid {}_SEARCH_DEBOUNCE_MS: {}", ENV_PREFIX, val))?;
        }

        if let Ok(val) = std::env::var(format!("{}_RECONNECT", ENV_PREFIX)) {
            self.reconnect = val.eq_ignore_ascii_case("true") || val == "1";
        }

        if let Ok(val) = std::env::var(format!("{}_VOTE_MODE", ENV_PREFIX)) {
            self.vote_mode = val.parse()?;
        }

        Ok(())
    }

    /// Ensure data directory exists
    pub fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with SCRIPTO_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scripto")
            .join("config.toml")
    }

    /// Path of the debug log
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("debug.log"))
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_ws_url() -> String {
    DEFAULT_WS_URL.to_string()
}

fn default_search_debounce_ms() -> u64 {
    500
}

fn default_reconnect() -> bool {
    true
}

fn default_initial_reconnect_delay_ms() -> u64 {
    1_000
}

fn default_max_reconnect_delay_ms() -> u64 {
    30_000
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scripto")
}
