//! Error types for the application.

use std::time::Duration;

use thiserror::Error;

/// Errors that abort bridge startup.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Relay connection could not be initialized")]
    RelayUnavailable,

    #[error("Bridge is already running")]
    AlreadyRunning,
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {message}")]
    IoError { path: String, message: String },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Relay connection errors (session setup and channel resolution).
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to connect to Discord: {message}")]
    ConnectFailed { message: String },

    #[error("Discord session did not become ready within {0:?}")]
    ReadyTimeout(Duration),

    #[error("Interrupted while waiting for the Discord session")]
    Interrupted,

    #[error("Discord session is not connected")]
    NotConnected,

    #[error("Channel not found: {channel_id}")]
    ChannelNotFound { channel_id: u64 },

    #[error("Channel {channel_id} is not a text channel")]
    NotTextChannel { channel_id: u64 },
}

/// Failures of an individual send after the connection was ready.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Discord session is not connected")]
    NotConnected,

    #[error("Serenity error: {0}")]
    Serenity(#[from] serenity::Error),
}

/// Result type alias for bridge startup.
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;
