//! Canonical message types for bridge communication.
//!
//! This module defines the single source of truth for the message types
//! that flow between the world and the relay channel.

use std::fmt;

/// Which side of the bridge a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceSystem {
    World,
    Relay,
}

/// Direction of a translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// World to relay channel.
    WorldToRelay,
    /// Relay channel to world.
    RelayToWorld,
}

/// Event category used for gating and styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Chat,
    Join,
    Quit,
    Advancement,
    Death,
    ServerStart,
    ServerStop,
}

impl Category {
    /// All categories, in configuration order.
    #[cfg(test)]
    pub const ALL: [Category; 7] = [
        Category::Chat,
        Category::Join,
        Category::Quit,
        Category::Advancement,
        Category::Death,
        Category::ServerStart,
        Category::ServerStop,
    ];

    /// Sidebar colour for rich relay messages.
    ///
    /// Lifecycle announcements have no colour and go out as plain text.
    pub fn colour(&self) -> Option<u32> {
        match self {
            Self::Join => Some(0x00FF00),
            Self::Quit => Some(0xFF0000),
            Self::Advancement => Some(0xFFD700),
            Self::Death => Some(0x8B0000),
            Self::Chat => Some(0x5865F2),
            Self::ServerStart | Self::ServerStop => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Join => "join",
            Self::Quit => "quit",
            Self::Advancement => "advancement",
            Self::Death => "death",
            Self::ServerStart => "server.start",
            Self::ServerStop => "server.stop",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved reference to the one relay channel the bridge targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelHandle(u64);

impl ChannelHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction-agnostic representation of a single translatable event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalMessage {
    /// Side the event originated on.
    pub source: SourceSystem,
    /// Event category.
    pub category: Category,
    /// Name of the player or user who caused the event.
    pub actor: String,
    /// Rendered message body.
    pub body: String,
    /// Avatar thumbnail for the actor, if any.
    pub avatar_url: Option<String>,
}

impl CanonicalMessage {
    /// Create a message originating from the world.
    pub fn from_world(category: Category, actor: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            source: SourceSystem::World,
            category,
            actor: actor.into(),
            body: body.into(),
            avatar_url: None,
        }
    }

    /// Create a message originating from the relay channel.
    pub fn from_relay(category: Category, actor: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            source: SourceSystem::Relay,
            ..Self::from_world(category, actor, body)
        }
    }

    /// Attach an avatar thumbnail.
    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }
}

/// Decorated relay payload built from a canonical message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichMessage {
    pub colour: Option<u32>,
    pub description: String,
    /// Author line (chat messages only).
    pub author: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl RichMessage {
    /// Build the rich form of a canonical message. Colour depends only on category.
    pub fn from_canonical(message: &CanonicalMessage) -> Self {
        let author = match message.category {
            Category::Chat => Some(message.actor.clone()),
            _ => None,
        };

        Self {
            colour: message.category.colour(),
            description: message.body.clone(),
            author,
            thumbnail_url: message.avatar_url.clone(),
        }
    }
}

/// A message received from the relay channel.
#[derive(Debug, Clone)]
pub struct RelayMessageEvent {
    /// Effective display name of the author.
    pub author_name: String,
    /// Whether the author is an automated account.
    pub author_is_bot: bool,
    /// Channel the message was posted in.
    pub channel: ChannelHandle,
    /// Display text with mentions resolved.
    pub content: String,
    /// Attachment URLs.
    pub attachments: Vec<String>,
}

impl RelayMessageEvent {
    /// Message text with attachment URLs appended.
    pub fn full_content(&self) -> String {
        let mut full_content = self.content.trim().to_string();
        for attachment in &self.attachments {
            if !full_content.is_empty() {
                full_content.push(' ');
            }
            full_content.push_str(attachment);
        }
        full_content
    }
}
