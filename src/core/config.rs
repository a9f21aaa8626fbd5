//! Client configuration persistence
//!
//! Loads [`ClientConfig`] from a JSON file in the platform configuration
//! directory. A missing or unreadable file falls back to defaults so a fresh
//! install connects to a local server without any setup.
//!
//! # File Location
//!
//! `client.json` under the project config dir, e.g.
//! `~/.config/xfchess-sync/client.json` on Linux. Falls back to a local
//! `client.json` if the system config dir cannot be found.

use crate::core::error::{CoreError, CoreResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Config filename
const CONFIG_FILENAME: &str = "client.json";

/// Failed connection attempts before the connection is declared exhausted
pub const DEFAULT_MAX_RETRIES: u32 = 15;

/// Default server endpoint
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:3000/ws";

/// Tunables for the game client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket URL of the game server
    pub endpoint: String,
    /// Consecutive failed connection attempts before giving up
    pub max_retries: u32,
    /// Upper bound of the random delay before each reconnect attempt
    pub reconnect_jitter_ms: u64,
    /// Capacity of the inbound event queue
    pub event_channel_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            reconnect_jitter_ms: 250,
            event_channel_capacity: 256,
        }
    }
}

impl ClientConfig {
    /// Parse and validate the configured endpoint.
    pub fn endpoint_url(&self) -> CoreResult<Url> {
        let url = Url::parse(&self.endpoint).map_err(|source| CoreError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            source,
        })?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(CoreError::UnsupportedScheme {
                scheme: other.to_string(),
            }),
        }
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_retries: self.max_retries,
            max_jitter: Duration::from_millis(self.reconnect_jitter_ms),
        }
    }

    /// Load from `path`, falling back to defaults on any failure.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!("[CONFIG] No config file at {:?}. Using defaults.", path);
            return Self::default();
        }

        match Self::load(path) {
            Ok(config) => {
                info!("[CONFIG] Loaded client config from {:?}", path);
                config
            }
            Err(e) => {
                warn!(
                    "[CONFIG] Failed to load config at {:?}: {}. Using defaults.",
                    path, e
                );
                Self::default()
            }
        }
    }

    pub fn load(path: &Path) -> CoreResult<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Reconnection policy handed to the connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub max_jitter: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ClientConfig::default().reconnect_policy()
    }
}

/// Helper to resolve the config file path
pub fn default_config_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "trilltino", "xfchess-sync") {
        proj_dirs.config_dir().join(CONFIG_FILENAME)
    } else {
        PathBuf::from(CONFIG_FILENAME)
    }
}
