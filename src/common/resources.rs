//! World resources: advancement titles and player avatars.

/// Base URL for player avatar thumbnails.
pub const AVATAR_SITE: &str = "https://minotar.net/avatar";

/// Advancement namespace that only tracks recipe unlocks.
pub const RECIPE_NAMESPACE: &str = "recipes/";

/// Known advancement titles, keyed by advancement id.
const ADVANCEMENT_NAMES: &[(&str, &str)] = &[
    ("story/mine_stone", "Stone Age!"),
    ("story/upgrade_tools", "Getting an Upgrade"),
    ("story/smelt_iron", "Acquire Hardware"),
    ("story/obtain_armor", "Suit Up"),
    ("story/lava_bucket", "Hot Stuff"),
    ("story/iron_tools", "Isn't It Iron Pick"),
    ("story/deflect_arrow", "Not Today, Thank You"),
    ("story/form_obsidian", "Ice Bucket Challenge"),
    ("story/mine_diamond", "Diamonds!"),
    ("story/enter_the_nether", "We Need to Go Deeper"),
    ("story/shiny_gear", "Cover Me with Diamonds"),
    ("story/enchant_item", "Enchanter"),
    ("story/cure_zombie_villager", "Zombie Doctor"),
    ("story/follow_ender_eye", "Eye Spy"),
    ("story/enter_the_end", "The End?"),
];

/// Whether an advancement only unlocks a recipe.
pub fn is_recipe_advancement(key: &str) -> bool {
    key.starts_with(RECIPE_NAMESPACE)
}

/// Get a human-readable advancement name.
///
/// Falls back to the last path segment with underscores replaced by spaces.
/// Returns `None` if nothing readable is left.
pub fn get_advancement_name(key: &str) -> Option<String> {
    if let Some((_, name)) = ADVANCEMENT_NAMES.iter().find(|(id, _)| *id == key) {
        return Some((*name).to_string());
    }

    let segment = key.rsplit('/').next().unwrap_or(key);
    let name = segment.replace('_', " ").trim().to_string();

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Avatar thumbnail URL for a player.
pub fn avatar_url(player: &str) -> String {
    format!("{}/{}/32", AVATAR_SITE, player)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_advancement() {
        assert_eq!(get_advancement_name("story/mine_stone").as_deref(), Some("Stone Age!"));
    }

    #[test]
    fn test_fallback_advancement_name() {
        assert_eq!(get_advancement_name("adventure/kill_a_mob").as_deref(), Some("kill a mob"));
        assert_eq!(get_advancement_name("husbandry/_tame_ ").as_deref(), Some("tame"));
        assert_eq!(get_advancement_name("root").as_deref(), Some("root"));
    }

    #[test]
    fn test_empty_fallback_is_none() {
        assert_eq!(get_advancement_name("adventure/"), None);
        assert_eq!(get_advancement_name("adventure/__"), None);
    }

    #[test]
    fn test_recipe_namespace() {
        assert!(is_recipe_advancement("recipes/anything"));
        assert!(is_recipe_advancement("recipes/misc/bread"));
        assert!(!is_recipe_advancement("story/recipes"));
    }

    #[test]
    fn test_avatar_url() {
        assert_eq!(avatar_url("Steve"), "https://minotar.net/avatar/Steve/32");
    }
}
