//! Emoji and formatting-code resolution for relay text shown in the world.
//!
//! World chat renders neither Unicode emoji nor Discord custom emoji, so both
//! are turned into `:shortcode:` text. Formatting codes typed by relay users
//! are stripped so they cannot restyle the broadcast.

use fancy_regex::Regex;

/// Message resolver for Discord -> world text.
#[derive(Debug, Clone)]
pub struct MessageResolver {
    /// Pattern for Discord custom emojis (<:name:id> or <a:name:id>).
    emoji_pattern: Regex,
    /// Pattern for world formatting codes (§a, §l, ...).
    format_code_pattern: Regex,
}

impl Default for MessageResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageResolver {
    pub fn new() -> Self {
        Self {
            emoji_pattern: Regex::new(r"<a?:([a-zA-Z0-9_]+):\d+>").unwrap(),
            format_code_pattern: Regex::new(r"§[0-9a-fk-orA-FK-OR]?").unwrap(),
        }
    }

    /// Convert Discord custom emojis to text representation.
    pub fn resolve_custom_emojis_to_text(&self, message: &str) -> String {
        self.emoji_pattern.replace_all(message, ":$1:").to_string()
    }

    /// Convert Unicode emojis to text aliases (e.g., 😀 -> :grinning:).
    ///
    /// Uses shortcode if available (like :joy:, :thumbsup:), otherwise falls back to name.
    pub fn resolve_unicode_emojis_to_text(&self, message: &str) -> String {
        let mut result = String::with_capacity(message.len() * 2);
        let mut chars = message.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch.is_ascii() {
                result.push(ch);
                continue;
            }

            if let Some(emoji) = emojis::get(ch.encode_utf8(&mut [0; 4])) {
                push_alias(&mut result, emoji);
                continue;
            }

            // Multi-codepoint emoji (variation selectors, skin tones)
            let mut grapheme = ch.to_string();
            if let Some(&next) = chars.peek() {
                if !next.is_ascii() {
                    grapheme.push(next);
                    if let Some(emoji) = emojis::get(&grapheme) {
                        chars.next();
                        push_alias(&mut result, emoji);
                        continue;
                    }
                    grapheme.pop();
                }
            }
            result.push_str(&grapheme);
        }

        result
    }

    /// Strip world formatting codes.
    pub fn strip_format_codes(&self, message: &str) -> String {
        self.format_code_pattern.replace_all(message, "").to_string()
    }

    /// Process a message from Discord for the world.
    pub fn process_relay_to_world(&self, message: &str) -> String {
        let step1 = self.resolve_unicode_emojis_to_text(message);
        let step2 = self.resolve_custom_emojis_to_text(&step1);
        self.strip_format_codes(&step2)
    }
}

fn push_alias(result: &mut String, emoji: &emojis::Emoji) {
    let alias = emoji.shortcode().unwrap_or_else(|| emoji.name());
    result.push(':');
    result.push_str(alias);
    result.push(':');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_custom_emojis_to_text() {
        let resolver = MessageResolver::new();

        let input = "Hello <:pepega:123456789> world <a:animated:987654321>";
        let output = resolver.resolve_custom_emojis_to_text(input);
        assert_eq!(output, "Hello :pepega: world :animated:");
    }

    #[test]
    fn test_resolve_unicode_emojis() {
        let resolver = MessageResolver::new();

        let output = resolver.resolve_unicode_emojis_to_text("Hello 😀 world");
        assert!(
            output.contains("grinning"),
            "Expected emoji name with 'grinning' in output, got: {}",
            output
        );
        assert!(output.starts_with("Hello :"));
        assert!(output.ends_with(": world"));

        let output = resolver.resolve_unicode_emojis_to_text("😀😂👍");
        assert!(output.contains("joy"), "Expected :joy: emoji, got: {}", output);
        assert!(output.contains("+1"), "Expected :+1: (thumbs up), got: {}", output);

        let output = resolver.resolve_unicode_emojis_to_text("Hey there 🎉 party!");
        assert!(output.contains("tada"), "Expected :tada:, got: {}", output);
        assert!(output.contains("Hey there"));
    }

    #[test]
    fn test_non_emoji_text_is_preserved() {
        let resolver = MessageResolver::new();

        assert_eq!(resolver.resolve_unicode_emojis_to_text("héllo wörld"), "héllo wörld");
        assert_eq!(resolver.resolve_unicode_emojis_to_text("привет"), "привет");
    }

    #[test]
    fn test_strip_format_codes() {
        let resolver = MessageResolver::new();

        assert_eq!(resolver.strip_format_codes("§ared §lbold§r text"), "red bold text");
        assert_eq!(resolver.strip_format_codes("lone §"), "lone ");
    }

    #[test]
    fn test_process_relay_to_world() {
        let resolver = MessageResolver::new();

        let output = resolver.process_relay_to_world("§cgg <:pog:42> 🎉");
        assert!(output.starts_with("gg :pog: :"), "got: {}", output);
        assert!(output.contains("tada"));
    }
}
