//! Error types for the chat session engine.

use thiserror::Error;

use super::EventKind;

/// Result type alias for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Main error type for the chat session engine
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("History request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not load message history: {message}")]
    History { message: String },

    #[error("Could not deliver message: {message}")]
    Publish { message: String },

    #[error("Could not subscribe to {kind} events: {message}")]
    Subscribe { kind: EventKind, message: String },

    #[error("Could not join room {room}: {message}")]
    Join { room: String, message: String },

    #[error("Profile lookup failed: {message}")]
    Profile { message: String },

    #[error("Escalation failed: {message}")]
    Escalation { message: String },

    #[error("Session is closed")]
    SessionClosed,

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ChatError {
    /// Create a history fetch error
    pub fn history(message: impl Into<String>) -> Self {
        Self::History { message: message.into() }
    }

    /// Create a publish error
    pub fn publish(message: impl Into<String>) -> Self {
        Self::Publish { message: message.into() }
    }

    /// Create a subscribe error for one event kind
    pub fn subscribe(kind: EventKind, message: impl Into<String>) -> Self {
        Self::Subscribe { kind, message: message.into() }
    }

    /// Create a room join error
    pub fn join(room: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Join { room: room.into(), message: message.into() }
    }

    /// Create a profile lookup error
    pub fn profile(message: impl Into<String>) -> Self {
        Self::Profile { message: message.into() }
    }

    /// Create an escalation error
    pub fn escalation(message: impl Into<String>) -> Self {
        Self::Escalation { message: message.into() }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON serialization error: {}", err),
        }
    }
}
