//! Common utilities and types shared across the application.

pub mod error;
pub mod messages;
pub mod resources;

// Re-export message types from messages module
pub use messages::{
    CanonicalMessage, Category, ChannelHandle, Direction, RelayMessageEvent, RichMessage,
};

// Re-export advancement functions from resources
pub use resources::{avatar_url, get_advancement_name, is_recipe_advancement};
