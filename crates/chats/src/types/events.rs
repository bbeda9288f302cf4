//! Event types carried on a room's publish/subscribe channel.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entities::ChatMessage;

/// The closed set of event kinds a session subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    NewMessage,
    Typing,
    Presence,
    Notification,
}

impl EventKind {
    /// Every kind, in the order a session subscribes to them
    pub const ALL: [EventKind; 4] = [
        EventKind::NewMessage,
        EventKind::Typing,
        EventKind::Presence,
        EventKind::Notification,
    ];

    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::NewMessage => "newMessage",
            EventKind::Typing => "typing",
            EventKind::Presence => "presence",
            EventKind::Notification => "notification",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A participant started or stopped typing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    pub user_id: String,
    pub is_typing: bool,
}

/// A participant came online or went offline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEvent {
    pub user_id: String,
    pub is_online: bool,
}

/// A free-form notice pushed by a participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeEvent {
    pub sender: String,
    pub body: String,
}

/// An event published on a room channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum RoomEvent {
    NewMessage(ChatMessage),
    Typing(TypingEvent),
    Presence(PresenceEvent),
    Notification(NoticeEvent),
}

impl RoomEvent {
    /// Kind of this event, used to route it to the matching listener
    pub fn kind(&self) -> EventKind {
        match self {
            RoomEvent::NewMessage(_) => EventKind::NewMessage,
            RoomEvent::Typing(_) => EventKind::Typing,
            RoomEvent::Presence(_) => EventKind::Presence,
            RoomEvent::Notification(_) => EventKind::Notification,
        }
    }

    /// User who caused the event
    pub fn origin(&self) -> &str {
        match self {
            RoomEvent::NewMessage(message) => &message.sender_id,
            RoomEvent::Typing(event) => &event.user_id,
            RoomEvent::Presence(event) => &event.user_id,
            RoomEvent::Notification(event) => &event.sender,
        }
    }
}
