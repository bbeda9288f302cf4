//! # Concierge Chats Crate
//!
//! This crate provides the real-time chat session engine of Concierge: a
//! two-party conversation channel with message history, presence and typing
//! state, and an FAQ auto-responder that hands the conversation to a human
//! after its first unanswered question.
//!
//! ## Architecture
//!
//! - **Entities**: Domain models (RoomId, ChatMessage, FaqTable, ...)
//! - **Services**: Session components and the [`ChatSession`] orchestrator
//! - **Channel**: The publish/subscribe capability a session consumes
//! - **Repositories**: History, profile and escalation collaborators
//! - **Types**: Errors and the room event vocabulary
//! - **Utils**: Internal utilities
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use concierge_chats::{InMemoryHistoryRepository, LocalEventChannel, SessionContext};
//!
//! # async fn run() -> concierge_chats::ChatResult<()> {
//! let context = SessionContext::new(
//!     Arc::new(LocalEventChannel::default()),
//!     Arc::new(InMemoryHistoryRepository::new()),
//! );
//! let mut session = context.open("tenant-7", "owner-3").await?;
//! session.send("is the property still available?")?;
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod entities;
pub mod repositories;
pub mod services;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use channel::{EventChannel, LocalEventChannel};
pub use entities::{
    derive_room, ChatMessage, EscalationStatus, EscalationTicket, FaqEntry, FaqTable,
    HistoryRecord, Notification, PeerProfile, PresenceState, RoomId,
};
pub use repositories::{
    EscalationHandler, HistoryRepository, HttpHistoryRepository, HttpProfileDirectory,
    InMemoryHistoryRepository, InMemoryProfileDirectory, LoggingEscalationHandler,
    ProfileDirectory, RecordingEscalationHandler,
};
pub use services::{
    AutoResponder, ChatSession, MessageStore, NotificationQueue, PresenceTracker, ResponderState,
    SessionContext, SessionSettings, SessionView, TypingIndicator,
};
pub use types::{ChatError, ChatResult, EventKind, RoomEvent};
