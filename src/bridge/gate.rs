//! Per-category enable flags.

use std::collections::HashMap;

use crate::common::Category;
use crate::config::MessagesConfig;

/// Enabled flag per category, read-only for a bridge session.
#[derive(Debug, Clone)]
pub struct CategoryGate {
    enabled: HashMap<Category, bool>,
}

impl CategoryGate {
    /// Build the gate from the `messages` config section.
    ///
    /// `messages.server.enabled` switches off both lifecycle announcements.
    pub fn from_config(messages: &MessagesConfig) -> Self {
        let server = messages.server.enabled;
        let enabled = HashMap::from([
            (Category::Chat, messages.chat.enabled),
            (Category::Join, messages.join.enabled),
            (Category::Quit, messages.quit.enabled),
            (Category::Advancement, messages.advancement.enabled),
            (Category::Death, messages.death.enabled),
            (Category::ServerStart, server && messages.server.start.enabled),
            (Category::ServerStop, server && messages.server.stop.enabled),
        ]);

        Self { enabled }
    }

    /// Gate with every category enabled.
    pub fn all_enabled() -> Self {
        Self::from_config(&MessagesConfig::default())
    }

    /// Whether events of this category should be relayed.
    pub fn is_enabled(&self, category: Category) -> bool {
        self.enabled.get(&category).copied().unwrap_or(true)
    }
}

impl Default for CategoryGate {
    fn default() -> Self {
        Self::all_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enable_everything() {
        let gate = CategoryGate::default();
        for category in Category::ALL {
            assert!(gate.is_enabled(category), "{} should be enabled", category);
        }
    }

    #[test]
    fn test_individual_flags() {
        let mut messages = MessagesConfig::default();
        messages.join.enabled = false;
        messages.death.enabled = false;
        let gate = CategoryGate::from_config(&messages);

        assert!(!gate.is_enabled(Category::Join));
        assert!(!gate.is_enabled(Category::Death));
        assert!(gate.is_enabled(Category::Quit));
        assert!(gate.is_enabled(Category::Chat));
    }

    #[test]
    fn test_server_flag_gates_both_announcements() {
        let mut messages = MessagesConfig::default();
        messages.server.enabled = false;
        let gate = CategoryGate::from_config(&messages);
        assert!(!gate.is_enabled(Category::ServerStart));
        assert!(!gate.is_enabled(Category::ServerStop));

        let mut messages = MessagesConfig::default();
        messages.server.start.enabled = false;
        let gate = CategoryGate::from_config(&messages);
        assert!(!gate.is_enabled(Category::ServerStart));
        assert!(gate.is_enabled(Category::ServerStop));
    }
}
