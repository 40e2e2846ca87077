//! Server configuration.
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! command-line flags applied by the caller.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BoardError, BoardResult};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_WS_PATH: &str = "/ws";
const DEFAULT_TOPIC: &str = "/topic/orderBoard";
const DEFAULT_APP_DESTINATION: &str = "/app/sendMessage";
const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Order board server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    pub host: String,
    pub port: u16,
    /// HTTP path upgraded to the STOMP WebSocket.
    pub ws_path: String,
    /// Broadcast topic every display subscribes to.
    pub topic: String,
    /// Destination clients SEND to when they want a fresh board.
    pub app_destination: String,
    /// Buffered snapshots per subscriber before it starts skipping.
    pub channel_capacity: usize,
    /// Server heart-beat interval advertised in CONNECTED; 0 disables it.
    pub heartbeat_ms: u64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ws_path: DEFAULT_WS_PATH.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            app_destination: DEFAULT_APP_DESTINATION.to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            heartbeat_ms: 0,
        }
    }
}

impl BoardConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml(raw: &str) -> BoardResult<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| BoardError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> BoardResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
            .map_err(|e| BoardError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> BoardResult<()> {
        if self.channel_capacity == 0 {
            return Err(BoardError::Config("channel_capacity must be at least 1".into()));
        }
        for (name, value) in [
            ("ws_path", &self.ws_path),
            ("topic", &self.topic),
            ("app_destination", &self.app_destination),
        ] {
            if !value.starts_with('/') {
                return Err(BoardError::Config(format!("{name} must start with '/': {value:?}")));
            }
        }
        if self.ws_path == "/health" || self.ws_path.starts_with("/api") {
            return Err(BoardError::Config(format!(
                "ws_path collides with an HTTP route: {:?}",
                self.ws_path
            )));
        }
        if self.ws_path.contains(['{', '*']) {
            return Err(BoardError::Config(format!(
                "ws_path must be a literal path: {:?}",
                self.ws_path
            )));
        }
        if self.topic == self.app_destination {
            return Err(BoardError::Config(
                "topic and app_destination must differ".into(),
            ));
        }
        Ok(())
    }

    /// `host:port` for binding the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
