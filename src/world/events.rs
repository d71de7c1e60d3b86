//! Events exchanged with the world host.
//!
//! Each line on the world link is one JSON object tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::bridge::router::WorldEventListener;

/// A player chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    pub player: String,
    pub message: String,
}

/// A player joining or leaving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEvent {
    pub player: String,
}

/// A player completing an advancement identified by its namespaced key path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancementEvent {
    pub player: String,
    pub key: String,
}

/// A player death. The host may omit the death message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathEvent {
    pub player: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Inbound world event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorldEvent {
    Chat(ChatEvent),
    Join(PresenceEvent),
    Quit(PresenceEvent),
    Advancement(AdvancementEvent),
    Death(DeathEvent),
}

impl WorldEvent {
    /// Hand the event to the matching listener callback.
    pub fn dispatch(&self, listener: &dyn WorldEventListener) {
        match self {
            WorldEvent::Chat(event) => listener.on_chat(event),
            WorldEvent::Join(event) => listener.on_join(event),
            WorldEvent::Quit(event) => listener.on_quit(event),
            WorldEvent::Advancement(event) => listener.on_advancement(event),
            WorldEvent::Death(event) => listener.on_death(event),
        }
    }
}

/// Outbound command to the world host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorldCommand {
    /// Show a line to every online player.
    Broadcast { message: String },
}
