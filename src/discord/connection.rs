//! Relay connection lifecycle.
//!
//! The connection manager owns the single Discord session used by the
//! bridge. State and the resolved channel live in one `watch` value so
//! readers always see a consistent pair; only the manager writes it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::common::error::{BridgeError, ConfigError, ConnectionError, DeliveryError};
use crate::common::{CanonicalMessage, ChannelHandle, RichMessage};

/// How long `shutdown` waits for queued sends before closing the session.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Relay network client primitives.
#[async_trait]
pub trait RelayClient: Send + Sync + 'static {
    /// Open a session with the given bot token.
    async fn connect(&self, token: &str) -> Result<(), ConnectionError>;

    /// Wait until the session reports ready.
    async fn await_ready(&self) -> Result<(), ConnectionError>;

    /// Look up the target channel.
    async fn resolve_channel(&self, channel_id: u64) -> Result<ChannelHandle, ConnectionError>;

    /// Whether the gateway is currently connected.
    fn is_connected(&self) -> bool;

    async fn send_text(&self, channel: ChannelHandle, text: &str) -> Result<(), DeliveryError>;

    async fn send_rich(&self, channel: ChannelHandle, message: &RichMessage) -> Result<(), DeliveryError>;

    /// Close the session. Must be safe to call without a session.
    async fn shutdown(&self);
}

/// Outbound side of the relay as seen by the event router.
pub trait RelayLink: Send + Sync {
    /// Queue a plain text message. Never blocks.
    fn send_text(&self, text: String);

    /// Queue a decorated message. Never blocks.
    fn send_rich(&self, message: CanonicalMessage);

    /// The resolved target channel, if the connection is ready.
    fn target_channel(&self) -> Option<ChannelHandle>;
}

/// Lifecycle of the relay connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Uninitialized,
    Connecting,
    Ready,
    Failed,
    ShuttingDown,
    Closed,
}

/// Consistent snapshot of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub channel: Option<ChannelHandle>,
}

/// Owns the Discord session for the lifetime of a bridge session.
pub struct RelayConnectionManager {
    client: Arc<dyn RelayClient>,
    status: watch::Sender<ConnectionStatus>,
    /// In-flight sends, drained on shutdown.
    tasks: TaskTracker,
}

impl RelayConnectionManager {
    pub fn new(client: Arc<dyn RelayClient>) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::default());
        Self {
            client,
            status,
            tasks: TaskTracker::new(),
        }
    }

    /// Current connection snapshot.
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn state(&self) -> ConnectionState {
        self.status().state
    }

    /// Connect, wait up to `timeout` for the session, and resolve the target channel.
    ///
    /// Returns `false` and leaves the state at `Failed` on any failure.
    pub async fn initialize(&self, token: &str, channel_id: &str, timeout: Duration) -> bool {
        let started = self.status.send_if_modified(|status| {
            if status.state == ConnectionState::Uninitialized {
                status.state = ConnectionState::Connecting;
                true
            } else {
                false
            }
        });
        if !started {
            warn!(state = ?self.state(), "Discord connection was already initialized");
            return false;
        }

        match self.try_initialize(token, channel_id, timeout).await {
            Ok(channel) => {
                let ready = self.status.send_if_modified(|status| {
                    if status.state == ConnectionState::Connecting {
                        *status = ConnectionStatus {
                            state: ConnectionState::Ready,
                            channel: Some(channel),
                        };
                        true
                    } else {
                        false
                    }
                });
                if ready {
                    info!(channel = %channel, "Successfully connected to Discord!");
                } else {
                    warn!("Discord connection was shut down during initialization");
                }
                ready
            }
            Err(e) => {
                error!("Failed to initialize Discord connection: {}", e);
                self.status.send_if_modified(|status| {
                    if status.state == ConnectionState::Connecting {
                        status.state = ConnectionState::Failed;
                        true
                    } else {
                        false
                    }
                });
                false
            }
        }
    }

    async fn try_initialize(
        &self,
        token: &str,
        channel_id: &str,
        timeout: Duration,
    ) -> Result<ChannelHandle, BridgeError> {
        if token.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "relay.token".to_string(),
            }
            .into());
        }

        let channel_id = channel_id.trim();
        if channel_id.is_empty() {
            return Err(ConfigError::MissingField {
                field: "relay.channel-id".to_string(),
            }
            .into());
        }
        let channel_id = channel_id
            .parse::<u64>()
            .ok()
            .filter(|id| *id != 0)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "relay.channel-id".to_string(),
                message: format!("'{}' is not a channel ID", channel_id),
            })?;

        self.client.connect(token).await?;

        match self.await_channel(channel_id, timeout).await {
            Ok(channel) => Ok(channel),
            Err(e) => {
                // Release the half-open session.
                self.client.shutdown().await;
                Err(e.into())
            }
        }
    }

    async fn await_channel(
        &self,
        channel_id: u64,
        timeout: Duration,
    ) -> Result<ChannelHandle, ConnectionError> {
        debug!("Waiting up to {:?} for Discord to become ready...", timeout);
        tokio::time::timeout(timeout, self.client.await_ready())
            .await
            .map_err(|_| ConnectionError::ReadyTimeout(timeout))??;

        self.client.resolve_channel(channel_id).await
    }

    /// The target channel if the connection is ready and the gateway is up.
    pub fn health_check(&self) -> Option<ChannelHandle> {
        let status = self.status();
        match (status.state, status.channel) {
            (ConnectionState::Ready, Some(channel)) if self.client.is_connected() => Some(channel),
            _ => None,
        }
    }

    /// Queue a plain text message to the target channel.
    pub fn send_text(&self, text: String) {
        let Some(channel) = self.health_check() else {
            debug!("Cannot send message: Discord not connected or channel not found");
            return;
        };

        let client = Arc::clone(&self.client);
        self.tasks.spawn(async move {
            match client.send_text(channel, &text).await {
                Ok(()) => debug!("Sent message to Discord: {}", text),
                Err(e) => warn!("Failed to send message to Discord: {}", e),
            }
        });
    }

    /// Queue a decorated message; categories without a colour go out as plain text.
    pub fn send_rich(&self, message: CanonicalMessage) {
        if message.category.colour().is_none() {
            self.send_text(message.body);
            return;
        }

        let Some(channel) = self.health_check() else {
            debug!("Cannot send embed: Discord not connected or channel not found");
            return;
        };

        let rich = RichMessage::from_canonical(&message);
        let client = Arc::clone(&self.client);
        self.tasks.spawn(async move {
            match client.send_rich(channel, &rich).await {
                Ok(()) => debug!(source = ?message.source, category = %message.category, "Sent embed to Discord"),
                Err(e) => warn!("Failed to send embed to Discord: {}", e),
            }
        });
    }

    /// Release the session. Idempotent; safe before `initialize`.
    pub async fn shutdown(&self) {
        let mut previous = ConnectionState::Uninitialized;
        let begin = self.status.send_if_modified(|status| match status.state {
            ConnectionState::ShuttingDown | ConnectionState::Closed => false,
            state => {
                previous = state;
                status.state = ConnectionState::ShuttingDown;
                true
            }
        });
        if !begin {
            debug!("Discord connection already shut down");
            return;
        }

        self.tasks.close();
        if tokio::time::timeout(SHUTDOWN_GRACE, self.tasks.wait()).await.is_err() {
            warn!("Dropping {} pending Discord sends", self.tasks.len());
        }

        if previous != ConnectionState::Uninitialized {
            self.client.shutdown().await;
        }

        self.status.send_modify(|status| {
            status.state = ConnectionState::Closed;
            status.channel = None;
        });
        info!("Discord connection closed");
    }
}

impl RelayLink for RelayConnectionManager {
    fn send_text(&self, text: String) {
        RelayConnectionManager::send_text(self, text);
    }

    fn send_rich(&self, message: CanonicalMessage) {
        RelayConnectionManager::send_rich(self, message);
    }

    fn target_channel(&self) -> Option<ChannelHandle> {
        self.health_check()
    }
}
