//! Shared types for the chat session engine.
//!
//! This module contains the error definitions and the event vocabulary
//! that travels over a room's publish/subscribe channel.

pub mod errors;
pub mod events;

// Re-export common types
pub use errors::{ChatError, ChatResult};
pub use events::*;
