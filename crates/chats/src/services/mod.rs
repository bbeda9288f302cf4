//! Session services.
//!
//! Each component owns one concern of a conversation. [`ChatSession`]
//! composes them and is the only type most callers need.

pub mod auto_responder;
pub mod chat_session;
pub mod message_store;
pub mod notification_queue;
pub mod outbox;
pub mod presence_tracker;
pub mod typing_indicator;

pub use auto_responder::{AutoReply, AutoResponder, ReplyKind, ResponderState};
pub use chat_session::{
    ChatSession, SessionContext, SessionSettings, SessionView, BOT_SENDER_ID,
    DEFAULT_FALLBACK_REPLY,
};
pub use message_store::{DayGroup, MessageStore};
pub use notification_queue::NotificationQueue;
pub use outbox::Outbox;
pub use presence_tracker::PresenceTracker;
pub use typing_indicator::TypingIndicator;
