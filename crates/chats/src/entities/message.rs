use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RoomId;

/// Represents one chat utterance within a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Client-generated identifier, shared by every copy of the same send
    pub id: String,
    /// User ID who sent the message
    #[serde(rename = "sender")]
    pub sender_id: String,
    /// User ID the message is addressed to
    #[serde(rename = "receiver")]
    pub receiver_id: String,
    /// Room this message belongs to
    #[serde(rename = "room")]
    pub room_id: RoomId,
    /// Message text
    pub body: String,
    /// Client-assigned send time
    pub created_at: DateTime<Utc>,
    /// Local read state, never meaningful on the wire
    #[serde(default)]
    pub read: bool,
}

impl ChatMessage {
    /// Create a new unread message stamped with the current time
    pub fn new(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        room_id: RoomId,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            room_id,
            body: body.into(),
            created_at: Utc::now(),
            read: false,
        }
    }

    /// Mark this copy as already read
    pub fn into_read(mut self) -> Self {
        self.read = true;
        self
    }

    /// Check if the given user authored this message
    pub fn is_from(&self, user_id: &str) -> bool {
        self.sender_id == user_id
    }

    /// Calendar day (UTC) the message was sent on
    pub fn day(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

/// A message record as returned by the history endpoint.
///
/// Every field is optional because the endpoint is not trusted to return
/// complete rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read: Option<bool>,
}

impl HistoryRecord {
    /// Convert into a message of `room`, or `None` when sender, receiver or
    /// body is missing or empty. The record's own room field is ignored.
    pub fn into_message(self, room: &RoomId) -> Option<ChatMessage> {
        let sender_id = self.sender.filter(|value| !value.is_empty())?;
        let receiver_id = self.receiver.filter(|value| !value.is_empty())?;
        let body = self.body.filter(|value| !value.is_empty())?;

        Some(ChatMessage {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            sender_id,
            receiver_id,
            room_id: room.clone(),
            body,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            read: self.read.unwrap_or(false),
        })
    }
}
