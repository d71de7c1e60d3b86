//! Event routing between the world and the relay channel.
//!
//! Two listener adapters sit on the host callbacks: world events are gated,
//! formatted and queued on the relay link; relay messages are filtered and
//! broadcast into the world. Neither side ever waits on the other.

use std::sync::Arc;

use tracing::debug;

use crate::bridge::formatter::Formatter;
use crate::bridge::gate::CategoryGate;
use crate::common::{
    avatar_url, get_advancement_name, is_recipe_advancement, CanonicalMessage, Category,
    RelayMessageEvent,
};
use crate::discord::connection::RelayLink;
use crate::world::events::{AdvancementEvent, ChatEvent, DeathEvent, PresenceEvent};

/// Callbacks for world events. Called on the host's dispatch path; must not block.
pub trait WorldEventListener: Send + Sync {
    fn on_chat(&self, event: &ChatEvent);
    fn on_join(&self, event: &PresenceEvent);
    fn on_quit(&self, event: &PresenceEvent);
    fn on_advancement(&self, event: &AdvancementEvent);
    fn on_death(&self, event: &DeathEvent);
}

/// Something that delivers world events to registered listeners.
pub trait WorldEventSource: Send + Sync {
    fn subscribe(&self, listener: Arc<dyn WorldEventListener>);
    /// Remove a listener added by `subscribe`.
    fn unsubscribe(&self, listener: &Arc<dyn WorldEventListener>);
}

/// Broadcast primitive of the world host.
pub trait WorldBroadcast: Send + Sync {
    /// Show a line to every player. Never blocks.
    fn broadcast(&self, message: String);
}

/// Callback for messages posted on the relay.
pub trait RelayMessageListener: Send + Sync {
    fn on_message(&self, event: &RelayMessageEvent);
}

/// Something that delivers relay messages to registered listeners.
pub trait RelayEventSource: Send + Sync {
    fn subscribe(&self, listener: Arc<dyn RelayMessageListener>);
    /// Remove a listener added by `subscribe`.
    fn unsubscribe(&self, listener: &Arc<dyn RelayMessageListener>);
}

/// World -> relay adapter.
pub struct WorldEventRouter {
    gate: Arc<CategoryGate>,
    formatter: Arc<Formatter>,
    relay: Arc<dyn RelayLink>,
}

impl WorldEventRouter {
    pub fn new(gate: Arc<CategoryGate>, formatter: Arc<Formatter>, relay: Arc<dyn RelayLink>) -> Self {
        Self {
            gate,
            formatter,
            relay,
        }
    }

    fn presence(&self, category: Category, player: &str) {
        if !self.gate.is_enabled(category) {
            return;
        }

        let body = self.formatter.presence(category, player);
        let message = CanonicalMessage::from_world(category, player, body).with_avatar(avatar_url(player));
        self.relay.send_rich(message);
    }
}

impl WorldEventListener for WorldEventRouter {
    fn on_chat(&self, event: &ChatEvent) {
        if !self.gate.is_enabled(Category::Chat) {
            return;
        }
        if event.message.trim().is_empty() {
            return;
        }

        let text = self.formatter.world_to_relay(&event.player, &event.message);
        self.relay.send_text(text);
    }

    fn on_join(&self, event: &PresenceEvent) {
        self.presence(Category::Join, &event.player);
    }

    fn on_quit(&self, event: &PresenceEvent) {
        self.presence(Category::Quit, &event.player);
    }

    fn on_advancement(&self, event: &AdvancementEvent) {
        if !self.gate.is_enabled(Category::Advancement) {
            return;
        }
        if is_recipe_advancement(&event.key) {
            return;
        }

        let Some(name) = get_advancement_name(&event.key) else {
            debug!("Skipping advancement with no display name: {}", event.key);
            return;
        };

        let body = self.formatter.advancement(&event.player, &name);
        let message = CanonicalMessage::from_world(Category::Advancement, &event.player, body)
            .with_avatar(avatar_url(&event.player));
        self.relay.send_rich(message);
    }

    fn on_death(&self, event: &DeathEvent) {
        if !self.gate.is_enabled(Category::Death) {
            return;
        }

        let death_message = match event.message.as_deref() {
            Some(message) if !message.trim().is_empty() => message,
            _ => return,
        };

        let body = self.formatter.death(&event.player, death_message);
        self.relay
            .send_rich(CanonicalMessage::from_world(Category::Death, &event.player, body));
    }
}

/// Relay -> world adapter.
pub struct RelayEventRouter {
    formatter: Arc<Formatter>,
    relay: Arc<dyn RelayLink>,
    world: Arc<dyn WorldBroadcast>,
}

impl RelayEventRouter {
    pub fn new(formatter: Arc<Formatter>, relay: Arc<dyn RelayLink>, world: Arc<dyn WorldBroadcast>) -> Self {
        Self {
            formatter,
            relay,
            world,
        }
    }
}

impl RelayMessageListener for RelayEventRouter {
    fn on_message(&self, event: &RelayMessageEvent) {
        if event.author_is_bot {
            return;
        }

        match self.relay.target_channel() {
            Some(channel) if channel == event.channel => {}
            _ => return,
        }

        let text = event.full_content();
        if text.is_empty() {
            return;
        }

        let message = CanonicalMessage::from_relay(Category::Chat, event.author_name.as_str(), text);
        debug!(source = ?message.source, "Discord -> world: {}: {}", message.actor, message.body);
        self.world
            .broadcast(self.formatter.relay_to_world(&message.actor, &message.body));
    }
}
