//! Domain entities for the chat session engine.

pub mod escalation;
pub mod faq;
pub mod message;
pub mod notification;
pub mod presence;
pub mod room;

pub use escalation::{EscalationStatus, EscalationTicket};
pub use faq::{FaqEntry, FaqTable};
pub use message::{ChatMessage, HistoryRecord};
pub use notification::Notification;
pub use presence::{PeerProfile, PresenceState};
pub use room::{derive_room, RoomId, ROOM_SEPARATOR};
