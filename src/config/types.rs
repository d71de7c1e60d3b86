//! Configuration type definitions.

use serde::Deserialize;

/// Default seconds to wait for the Discord session to become ready.
pub const DEFAULT_READY_TIMEOUT_SECS: u64 = 30;

/// Default address of the world-link shim.
pub const DEFAULT_WORLD_ADDRESS: &str = "127.0.0.1:25580";

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub relay: RelayConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
    /// Raise log verbosity to DEBUG.
    #[serde(default)]
    pub debug: bool,
}

/// Discord connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub token: String,
    /// Target channel snowflake, kept as a string like Discord presents it.
    #[serde(rename = "channel-id", default)]
    pub channel_id: String,
    /// Seconds to wait for the session to become ready.
    #[serde(rename = "ready-timeout", default = "default_ready_timeout")]
    pub ready_timeout_secs: u64,
}

fn default_ready_timeout() -> u64 {
    DEFAULT_READY_TIMEOUT_SECS
}

/// World-link connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WorldConfig {
    #[serde(default = "default_world_address")]
    pub address: String,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            address: default_world_address(),
        }
    }
}

fn default_world_address() -> String {
    DEFAULT_WORLD_ADDRESS.to_string()
}

/// Per-category message settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagesConfig {
    #[serde(default)]
    pub chat: MessageTypeConfig,
    #[serde(default)]
    pub join: MessageTypeConfig,
    #[serde(default)]
    pub quit: MessageTypeConfig,
    #[serde(default)]
    pub advancement: MessageTypeConfig,
    #[serde(default)]
    pub death: MessageTypeConfig,
    #[serde(default)]
    pub server: ServerMessagesConfig,
}

/// Enable flag and template for one message type.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageTypeConfig {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for MessageTypeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: None,
        }
    }
}

/// Server lifecycle announcements.
///
/// `enabled` gates both announcements; each one can also be switched off on its own.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerMessagesConfig {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub start: MessageTypeConfig,
    #[serde(default)]
    pub stop: MessageTypeConfig,
}

impl Default for ServerMessagesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start: MessageTypeConfig::default(),
            stop: MessageTypeConfig::default(),
        }
    }
}

fn enabled_by_default() -> bool {
    true
}

impl Config {
    /// Parse the configured channel id.
    pub fn channel_id(&self) -> Option<u64> {
        self.relay.channel_id.trim().parse().ok().filter(|id| *id != 0)
    }

    /// How long to wait for the Discord session.
    pub fn ready_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.relay.ready_timeout_secs)
    }
}

#[cfg(test)]
impl Config {
    /// Minimal valid configuration for tests.
    pub fn for_tests() -> Self {
        Self {
            relay: RelayConfig {
                token: "test_token".to_string(),
                channel_id: "123456789".to_string(),
                ready_timeout_secs: DEFAULT_READY_TIMEOUT_SECS,
            },
            world: WorldConfig::default(),
            messages: MessagesConfig::default(),
            debug: false,
        }
    }
}
