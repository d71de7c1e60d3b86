//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `CHATSYNC_RELAY_TOKEN` - Discord bot token
//! - `CHATSYNC_RELAY_CHANNEL_ID` - Discord channel ID
//! - `CHATSYNC_WORLD_ADDRESS` - World-link address
//! - `CHATSYNC_DEBUG` - Verbose logging (`true`/`false`)

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "CHATSYNC";

/// Apply environment variable overrides to a config.
///
/// This allows the bot token to be provided via the environment
/// instead of the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(token) = env::var(format!("{}_RELAY_TOKEN", ENV_PREFIX)) {
        config.relay.token = token;
    }
    if let Ok(channel_id) = env::var(format!("{}_RELAY_CHANNEL_ID", ENV_PREFIX)) {
        config.relay.channel_id = channel_id;
    }

    if let Ok(address) = env::var(format!("{}_WORLD_ADDRESS", ENV_PREFIX)) {
        config.world.address = address;
    }

    if let Ok(debug) = env::var(format!("{}_DEBUG", ENV_PREFIX)) {
        if let Ok(debug) = debug.parse() {
            config.debug = debug;
        }
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `CHATSYNC_CONFIG` environment variable, otherwise returns "chatsync.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "chatsync.conf".to_string())
}
