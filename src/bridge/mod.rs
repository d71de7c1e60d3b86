//! Bidirectional world <-> relay bridge.
//!
//! ## Module Structure
//!
//! - `formatter`: Template rendering per category and direction
//! - `gate`: Per-category enable flags
//! - `router`: Host callback traits and the two routing adapters
//! - `controller`: Session lifecycle (`BridgeController`)

pub mod controller;
pub mod formatter;
pub mod gate;
pub mod router;

pub use controller::BridgeController;
