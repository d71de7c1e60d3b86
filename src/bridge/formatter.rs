//! Message formatting for display.
//!
//! Handles placeholder substitution in message format strings.
//! Supports placeholders: %time%, %player%, %message%, %advancement%

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::Local;
use fancy_regex::{Captures, Regex};

use crate::common::{Category, Direction};
use crate::config::MessagesConfig;

/// Default format for world chat sent to the relay channel.
pub const DEFAULT_CHAT_FORMAT: &str = "**%player%**: %message%";

/// Default format for join notifications.
pub const DEFAULT_JOIN_FORMAT: &str = "%player% joined the server";

/// Default format for quit notifications.
pub const DEFAULT_QUIT_FORMAT: &str = "%player% left the server";

/// Default format for advancement notifications.
pub const DEFAULT_ADVANCEMENT_FORMAT: &str = "%player% has made the advancement\n%advancement%";

/// Default format for death notifications (the world's own death message).
pub const DEFAULT_DEATH_FORMAT: &str = "%message%";

/// Default server start announcement.
pub const DEFAULT_START_FORMAT: &str = "Server has started";

/// Default server stop announcement.
pub const DEFAULT_STOP_FORMAT: &str = "Server has stopped";

/// Decoration for relay chat shown in the world.
pub const RELAY_TO_WORLD_FORMAT: &str = "§9Discord §8» §7%player%§8: §f%message%";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%(time|player|message|advancement)%").expect("placeholder pattern is valid")
});

/// Message formatter that substitutes placeholders in a format string.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    /// Format string for this formatter.
    format: String,
}

impl MessageFormatter {
    /// Create a new formatter with the given format string.
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }

    /// Format a message with the given context.
    ///
    /// Placeholders are substituted in one pass over the template, so values
    /// that look like placeholders are never expanded again.
    pub fn format(&self, ctx: &FormatContext) -> String {
        PLACEHOLDER
            .replace_all(&self.format, |caps: &Captures<'_>| match &caps[1] {
                "time" => get_time(),
                "player" => ctx.player.clone(),
                "advancement" => ctx.advancement.clone(),
                _ => ctx.message.clone(),
            })
            .into_owned()
    }

    /// Get the format string.
    #[cfg(test)]
    pub fn format_string(&self) -> &str {
        &self.format
    }
}

/// Context for message formatting.
#[derive(Debug, Clone, Default)]
pub struct FormatContext {
    /// The player or user name.
    pub player: String,
    /// The message content.
    pub message: String,
    /// Advancement name (for advancement events).
    pub advancement: String,
}

impl FormatContext {
    /// Create a new format context.
    pub fn new(player: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            message: message.into(),
            advancement: String::new(),
        }
    }

    /// Set the advancement.
    pub fn with_advancement(mut self, advancement: impl Into<String>) -> Self {
        self.advancement = advancement.into();
        self
    }
}

/// Templates keyed by (category, direction), loaded once per bridge session.
#[derive(Debug, Clone)]
pub struct FormatRules {
    templates: HashMap<(Category, Direction), MessageFormatter>,
}

impl FormatRules {
    /// Build rules from the `messages` config section, falling back to defaults.
    pub fn from_config(messages: &MessagesConfig) -> Self {
        let configured = [
            (Category::Chat, &messages.chat.format),
            (Category::Join, &messages.join.format),
            (Category::Quit, &messages.quit.format),
            (Category::Advancement, &messages.advancement.format),
            (Category::Death, &messages.death.format),
            (Category::ServerStart, &messages.server.start.format),
            (Category::ServerStop, &messages.server.stop.format),
        ];

        let mut templates = HashMap::new();
        for (category, format) in configured {
            let format = format
                .clone()
                .unwrap_or_else(|| default_format(category).to_string());
            templates.insert((category, Direction::WorldToRelay), MessageFormatter::new(format));
        }
        templates.insert(
            (Category::Chat, Direction::RelayToWorld),
            MessageFormatter::new(RELAY_TO_WORLD_FORMAT),
        );

        Self { templates }
    }

    /// Formatter for a category and direction.
    pub fn get(&self, category: Category, direction: Direction) -> MessageFormatter {
        self.templates
            .get(&(category, direction))
            .cloned()
            .unwrap_or_else(|| MessageFormatter::new(fallback_format(category, direction)))
    }
}

impl Default for FormatRules {
    fn default() -> Self {
        Self::from_config(&MessagesConfig::default())
    }
}

fn default_format(category: Category) -> &'static str {
    match category {
        Category::Chat => DEFAULT_CHAT_FORMAT,
        Category::Join => DEFAULT_JOIN_FORMAT,
        Category::Quit => DEFAULT_QUIT_FORMAT,
        Category::Advancement => DEFAULT_ADVANCEMENT_FORMAT,
        Category::Death => DEFAULT_DEATH_FORMAT,
        Category::ServerStart => DEFAULT_START_FORMAT,
        Category::ServerStop => DEFAULT_STOP_FORMAT,
    }
}

fn fallback_format(category: Category, direction: Direction) -> &'static str {
    match direction {
        Direction::WorldToRelay => default_format(category),
        Direction::RelayToWorld => RELAY_TO_WORLD_FORMAT,
    }
}

/// Stateless translation between native events and presentation strings.
#[derive(Debug, Clone, Default)]
pub struct Formatter {
    rules: FormatRules,
}

impl Formatter {
    pub fn new(rules: FormatRules) -> Self {
        Self { rules }
    }

    /// World chat line as sent to the relay channel.
    pub fn world_to_relay(&self, player: &str, message: &str) -> String {
        self.render(Category::Chat, Direction::WorldToRelay, &FormatContext::new(player, message))
    }

    /// Relay chat line as broadcast in the world.
    pub fn relay_to_world(&self, player: &str, message: &str) -> String {
        self.render(Category::Chat, Direction::RelayToWorld, &FormatContext::new(player, message))
    }

    /// Join or quit notification body.
    pub fn presence(&self, category: Category, player: &str) -> String {
        self.render(category, Direction::WorldToRelay, &FormatContext::new(player, ""))
    }

    /// Advancement notification body.
    pub fn advancement(&self, player: &str, advancement: &str) -> String {
        let ctx = FormatContext::new(player, "").with_advancement(advancement);
        self.render(Category::Advancement, Direction::WorldToRelay, &ctx)
    }

    /// Death notification body from the world's death message.
    pub fn death(&self, player: &str, message: &str) -> String {
        self.render(Category::Death, Direction::WorldToRelay, &FormatContext::new(player, message))
    }

    /// Server lifecycle announcement.
    pub fn announcement(&self, category: Category) -> String {
        self.render(category, Direction::WorldToRelay, &FormatContext::default())
    }

    fn render(&self, category: Category, direction: Direction, ctx: &FormatContext) -> String {
        self.rules.get(category, direction).format(ctx)
    }
}

/// Get the current time as HH:MM:SS string.
fn get_time() -> String {
    Local::now().format("%H:%M:%S").to_string()
}
