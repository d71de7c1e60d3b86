//! Discord relay integration.
//!
//! The connection manager owns the session lifecycle; the serenity client
//! supplies the network primitives and channel message events.

pub mod client;
pub mod connection;
pub mod resolver;

#[cfg(test)]
pub mod testing;

pub use client::SerenityRelay;
