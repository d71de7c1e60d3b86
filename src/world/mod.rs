//! World host integration.
//!
//! Events arrive from a shim on the world host over a line-based JSON link;
//! broadcasts go back over the same connection.

pub mod codec;
pub mod events;
pub mod link;

pub use link::WorldLink;
