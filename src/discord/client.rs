//! Discord relay client.
//!
//! Implements the relay primitives on top of serenity and forwards channel
//! messages to registered listeners. Gateway events are pushed through an
//! unbounded channel and handled on a separate task so the gateway never
//! waits on the bridge.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serenity::all::{
    ChannelId, ChannelType, Colour, CreateAllowedMentions, CreateEmbed, CreateEmbedAuthor,
    CreateMessage, ShardManager,
};
use serenity::async_trait;
use serenity::gateway::{ConnectionStage, ShardStageUpdateEvent};
use serenity::http::{Http, HttpBuilder};
use serenity::model::channel::{Channel, Message};
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use serenity::Client;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bridge::router::{RelayEventSource, RelayMessageListener};
use crate::common::error::{ConnectionError, DeliveryError};
use crate::common::{ChannelHandle, RelayMessageEvent, RichMessage};
use crate::discord::connection::RelayClient;
use crate::discord::resolver::MessageResolver;

#[derive(Debug, Clone)]
pub enum DiscordBotEvent {
    /// Bot connected and ready.
    Ready(Ready),
    /// Shard connection stage changed.
    StageUpdate(ConnectionStage),
    /// Message received.
    Message {
        context: Context,
        message: Message,
    },
    /// The client stopped, with the error if it failed.
    Disconnected(Option<String>),
}

struct DiscordBotEvents {
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
}

impl DiscordBotEvents {
    fn new(discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>) -> Self {
        Self { discord_events_tx }
    }

    fn forward(&self, event: DiscordBotEvent) {
        if let Err(error) = self.discord_events_tx.send(event) {
            warn!("Failed to process discord event: {}", error);
        }
    }
}

#[async_trait]
impl EventHandler for DiscordBotEvents {
    async fn ready(&self, _context: Context, ready: Ready) {
        self.forward(DiscordBotEvent::Ready(ready));
    }

    async fn shard_stage_update(&self, _context: Context, event: ShardStageUpdateEvent) {
        self.forward(DiscordBotEvent::StageUpdate(event.new));
    }

    async fn message(&self, context: Context, message: Message) {
        self.forward(DiscordBotEvent::Message { context, message });
    }
}

async fn build_client(
    token: &str,
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
) -> anyhow::Result<Client> {
    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;

    // Build a custom reqwest client with timeout settings
    let reqwest_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    // Build the Serenity HTTP client with our custom reqwest client
    let http = HttpBuilder::new(token).client(reqwest_client).build();

    let events = DiscordBotEvents::new(discord_events_tx);
    let client = serenity::client::ClientBuilder::new_with_http(http, intents)
        .event_handler(events)
        .await?;
    Ok(client)
}

/// Gateway status as seen by the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
enum GatewayStatus {
    Idle,
    Connecting,
    Connected,
    Reconnecting,
    Failed(String),
}

type Listeners = Arc<Mutex<Vec<Arc<dyn RelayMessageListener>>>>;

/// A running serenity client.
struct DiscordSession {
    http: Arc<Http>,
    shard_manager: Arc<ShardManager>,
    client_task: JoinHandle<()>,
    events_task: JoinHandle<()>,
}

/// Relay client backed by a Discord bot account.
pub struct SerenityRelay {
    listeners: Listeners,
    status: Arc<watch::Sender<GatewayStatus>>,
    session: tokio::sync::Mutex<Option<DiscordSession>>,
}

impl SerenityRelay {
    pub fn new() -> Self {
        let (status, _) = watch::channel(GatewayStatus::Idle);
        Self {
            listeners: Arc::new(Mutex::new(Vec::new())),
            status: Arc::new(status),
            session: tokio::sync::Mutex::new(None),
        }
    }

    async fn http(&self) -> Result<Arc<Http>, DeliveryError> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| Arc::clone(&session.http))
            .ok_or(DeliveryError::NotConnected)
    }

    async fn process_events(
        mut discord_events_rx: mpsc::UnboundedReceiver<DiscordBotEvent>,
        status: Arc<watch::Sender<GatewayStatus>>,
        listeners: Listeners,
    ) {
        let resolver = MessageResolver::new();

        while let Some(event) = discord_events_rx.recv().await {
            match event {
                DiscordBotEvent::Ready(ready) => {
                    info!("Discord bot connected as {}", ready.user.name);
                    status.send_replace(GatewayStatus::Connected);
                }
                DiscordBotEvent::StageUpdate(stage) => {
                    debug!("Discord shard stage: {:?}", stage);
                    status.send_if_modified(|current| {
                        let next = match (&*current, stage) {
                            (GatewayStatus::Reconnecting, ConnectionStage::Connected) => {
                                info!("Discord gateway reconnected");
                                GatewayStatus::Connected
                            }
                            (GatewayStatus::Connected, stage) if stage != ConnectionStage::Connected => {
                                warn!("Discord gateway connection lost, serenity is reconnecting");
                                GatewayStatus::Reconnecting
                            }
                            _ => return false,
                        };
                        *current = next;
                        true
                    });
                }
                DiscordBotEvent::Message { context, message } => {
                    let Some(event) = relay_message_event(&context, &message, &resolver) else {
                        continue;
                    };
                    let listeners = listeners
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .clone();
                    for listener in listeners {
                        listener.on_message(&event);
                    }
                }
                DiscordBotEvent::Disconnected(error) => {
                    let reason = error.unwrap_or_else(|| "client stopped".to_string());
                    status.send_replace(GatewayStatus::Failed(reason));
                }
            }
        }
        debug!("Discord events channel closed.");
    }
}

impl Default for SerenityRelay {
    fn default() -> Self {
        Self::new()
    }
}

/// Outgoing message that never pings anyone, whatever players type in game.
fn quiet_message() -> CreateMessage {
    CreateMessage::new().allowed_mentions(CreateAllowedMentions::new())
}

/// Build the bridge view of a channel message. Direct messages are ignored.
fn relay_message_event(
    context: &Context,
    message: &Message,
    resolver: &MessageResolver,
) -> Option<RelayMessageEvent> {
    message.guild_id?;

    let author_name = message
        .member
        .as_ref()
        .and_then(|member| member.nick.clone())
        .or_else(|| message.author.global_name.clone())
        .unwrap_or_else(|| message.author.name.clone());

    let content = resolver.process_relay_to_world(&message.content_safe(&context.cache));

    Some(RelayMessageEvent {
        author_name,
        author_is_bot: message.author.bot,
        channel: ChannelHandle::new(message.channel_id.get()),
        content,
        attachments: message
            .attachments
            .iter()
            .map(|attachment| attachment.url.clone())
            .collect(),
    })
}

#[async_trait]
impl RelayClient for SerenityRelay {
    async fn connect(&self, token: &str) -> Result<(), ConnectionError> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return Err(ConnectionError::ConnectFailed {
                message: "a Discord session is already open".to_string(),
            });
        }

        info!("Connecting to Discord...");
        let (discord_events_tx, discord_events_rx) = mpsc::unbounded_channel::<DiscordBotEvent>();
        let mut client = build_client(token, discord_events_tx.clone())
            .await
            .map_err(|e| ConnectionError::ConnectFailed {
                message: e.to_string(),
            })?;

        self.status.send_replace(GatewayStatus::Connecting);

        let http = Arc::clone(&client.http);
        let shard_manager = Arc::clone(&client.shard_manager);

        let events_task = tokio::spawn(Self::process_events(
            discord_events_rx,
            Arc::clone(&self.status),
            Arc::clone(&self.listeners),
        ));

        let client_task = tokio::spawn(async move {
            let result = client.start().await;
            let error = match result {
                Ok(()) => {
                    info!("Discord client disconnected normally");
                    None
                }
                Err(e) => {
                    error!("Discord client error: {}", e);
                    Some(e.to_string())
                }
            };
            if let Err(error) = discord_events_tx.send(DiscordBotEvent::Disconnected(error)) {
                debug!("Failed to process discord event: {}", error);
            }
        });

        *session = Some(DiscordSession {
            http,
            shard_manager,
            client_task,
            events_task,
        });
        Ok(())
    }

    async fn await_ready(&self) -> Result<(), ConnectionError> {
        let mut status = self.status.subscribe();
        let status = status
            .wait_for(|status| {
                matches!(status, GatewayStatus::Connected | GatewayStatus::Failed(_))
            })
            .await
            .map_err(|_| ConnectionError::Interrupted)?
            .clone();

        match status {
            GatewayStatus::Failed(message) => Err(ConnectionError::ConnectFailed { message }),
            _ => Ok(()),
        }
    }

    async fn resolve_channel(&self, channel_id: u64) -> Result<ChannelHandle, ConnectionError> {
        let http = self.http().await.map_err(|_| ConnectionError::NotConnected)?;

        let channel = http.get_channel(ChannelId::new(channel_id)).await.map_err(|e| {
            debug!("Channel lookup failed: {}", e);
            ConnectionError::ChannelNotFound { channel_id }
        })?;

        match channel {
            Channel::Guild(channel) if matches!(channel.kind, ChannelType::Text | ChannelType::News) => {
                info!("Resolved Discord channel #{} ({})", channel.name, channel_id);
                Ok(ChannelHandle::new(channel_id))
            }
            _ => Err(ConnectionError::NotTextChannel { channel_id }),
        }
    }

    fn is_connected(&self) -> bool {
        *self.status.borrow() == GatewayStatus::Connected
    }

    async fn send_text(&self, channel: ChannelHandle, text: &str) -> Result<(), DeliveryError> {
        let http = self.http().await?;
        ChannelId::new(channel.id())
            .send_message(&*http, quiet_message().content(text))
            .await?;
        Ok(())
    }

    async fn send_rich(&self, channel: ChannelHandle, message: &RichMessage) -> Result<(), DeliveryError> {
        let http = self.http().await?;

        let mut embed = CreateEmbed::new().description(&message.description);
        if let Some(colour) = message.colour {
            embed = embed.colour(Colour::new(colour));
        }
        if let Some(ref author) = message.author {
            embed = embed.author(CreateEmbedAuthor::new(author));
        }
        if let Some(ref thumbnail) = message.thumbnail_url {
            embed = embed.thumbnail(thumbnail);
        }

        ChannelId::new(channel.id())
            .send_message(&*http, quiet_message().embed(embed))
            .await?;
        Ok(())
    }

    async fn shutdown(&self) {
        let Some(session) = self.session.lock().await.take() else {
            return;
        };

        info!("Initiating graceful Discord shutdown...");
        session.shard_manager.shutdown_all().await;

        let mut client_task = session.client_task;
        if tokio::time::timeout(Duration::from_secs(5), &mut client_task).await.is_err() {
            warn!("Discord client did not stop in time");
            client_task.abort();
        }
        session.events_task.abort();

        self.status.send_replace(GatewayStatus::Idle);
        info!("Discord shutdown complete");
    }
}

impl RelayEventSource for SerenityRelay {
    fn subscribe(&self, listener: Arc<dyn RelayMessageListener>) {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(listener);
    }

    fn unsubscribe(&self, listener: &Arc<dyn RelayMessageListener>) {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .retain(|registered| !Arc::ptr_eq(registered, listener));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outgoing_messages_allow_no_mentions() {
        let payload = serde_json::to_value(quiet_message().content("@everyone look")).unwrap();

        assert_eq!(payload["content"], "@everyone look");
        assert_eq!(payload["allowed_mentions"]["parse"], serde_json::json!([]));
        assert_eq!(payload["allowed_mentions"]["users"], serde_json::json!([]));
        assert_eq!(payload["allowed_mentions"]["roles"], serde_json::json!([]));
    }
}
