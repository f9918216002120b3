//! Configuration types for the caption synchronization engine

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for a [`SyncController`](crate::SyncController)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// WebSocket URL of the caption service (ws:// or wss://)
    pub backend_url: String,

    /// Position polling cadence in milliseconds (default: 100, range: 10-1000)
    pub poll_interval_ms: u64,

    /// Channel establishment timeout in milliseconds (default: 10000)
    pub connect_timeout_ms: u64,

    /// Show the source-language text next to the translation (default: true)
    pub show_source_text: bool,

    /// Ask the player to start playing as soon as it is ready (default: false)
    pub autoplay: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            backend_url: "ws://localhost:8000/ws/realtime".to_string(),
            poll_interval_ms: 100,
            connect_timeout_ms: 10_000,
            show_source_text: true,
            autoplay: false,
        }
    }
}

impl SyncConfig {
    /// Polling cadence as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Connect timeout as a `Duration`
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `backend_url` is not a valid WebSocket URL
    /// - `poll_interval_ms` is not in range 10-1000
    /// - `connect_timeout_ms` is zero
    pub fn validate(&self) -> Result<()> {
        if !self.backend_url.starts_with("ws://") && !self.backend_url.starts_with("wss://") {
            return Err(Error::InvalidConfig(format!(
                "backend_url must start with ws:// or wss://, got {}",
                self.backend_url
            )));
        }

        url::Url::parse(&self.backend_url).map_err(|e| {
            Error::InvalidConfig(format!("backend_url is not a valid URL: {}", e))
        })?;

        if self.poll_interval_ms < 10 || self.poll_interval_ms > 1000 {
            return Err(Error::InvalidConfig(format!(
                "poll_interval_ms must be in range 10-1000, got {}",
                self.poll_interval_ms
            )));
        }

        if self.connect_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "connect_timeout_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from `CAPTION_SYNC_*` environment variables
    ///
    /// - `CAPTION_SYNC_BACKEND_URL`
    /// - `CAPTION_SYNC_POLL_INTERVAL_MS`
    /// - `CAPTION_SYNC_CONNECT_TIMEOUT_MS`
    /// - `CAPTION_SYNC_SHOW_SOURCE`
    /// - `CAPTION_SYNC_AUTOPLAY`
    ///
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse configuration from a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SyncConfig = toml::from_str(text)
            .map_err(|e| Error::InvalidConfig(format!("Invalid TOML configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let backend_url = lookup("CAPTION_SYNC_BACKEND_URL").unwrap_or(defaults.backend_url);

        let poll_interval_ms = lookup("CAPTION_SYNC_POLL_INTERVAL_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.poll_interval_ms);

        let connect_timeout_ms = lookup("CAPTION_SYNC_CONNECT_TIMEOUT_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.connect_timeout_ms);

        let show_source_text = lookup("CAPTION_SYNC_SHOW_SOURCE")
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(defaults.show_source_text);

        let autoplay = lookup("CAPTION_SYNC_AUTOPLAY")
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(defaults.autoplay);

        let config = Self {
            backend_url,
            poll_interval_ms,
            connect_timeout_ms,
            show_source_text,
            autoplay,
        };

        config.validate()?;

        Ok(config)
    }
}
