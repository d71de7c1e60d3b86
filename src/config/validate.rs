//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use crate::common::error::ConfigError;
use crate::config::types::{Config, MessageTypeConfig};

/// Placeholder shipped in the example configuration.
const TOKEN_PLACEHOLDER: &str = "YOUR_BOT_TOKEN_HERE";

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Validate relay config
    if config.relay.token.trim().is_empty() {
        errors.push("relay.token is required".to_string());
    }
    if config.relay.token == TOKEN_PLACEHOLDER {
        errors.push("relay.token has not been configured (still using placeholder)".to_string());
    }

    let channel_id = config.relay.channel_id.trim();
    if channel_id.is_empty() {
        errors.push("relay.channel-id is required".to_string());
    } else if config.channel_id().is_none() {
        errors.push(format!(
            "relay.channel-id '{}' is not a valid channel ID",
            channel_id
        ));
    }

    if config.relay.ready_timeout_secs == 0 {
        errors.push("relay.ready-timeout must be non-zero".to_string());
    }

    // Validate world config
    if config.world.address.trim().is_empty() {
        errors.push("world.address is required".to_string());
    }

    // Validate message templates
    let templates = [
        ("chat", &config.messages.chat),
        ("join", &config.messages.join),
        ("quit", &config.messages.quit),
        ("advancement", &config.messages.advancement),
        ("death", &config.messages.death),
        ("server.start", &config.messages.server.start),
        ("server.stop", &config.messages.server.stop),
    ];
    for (path, message) in templates {
        if let Some(error) = check_template(path, message) {
            errors.push(error);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}

fn check_template(path: &str, message: &MessageTypeConfig) -> Option<String> {
    match message.format {
        Some(ref format) if format.trim().is_empty() => Some(format!(
            "messages.{}.format is empty (remove it to use the default)",
            path
        )),
        _ => None,
    }
}
