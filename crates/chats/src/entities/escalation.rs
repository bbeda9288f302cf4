use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RoomId;

/// Follow-up status of an escalated conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationStatus {
    Pending,
}

/// Hand-off record sent outward when the auto-responder gives up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationTicket {
    pub room_id: RoomId,
    pub last_message_text: String,
    pub status: EscalationStatus,
    pub last_resolved_at: Option<DateTime<Utc>>,
}

impl EscalationTicket {
    /// A freshly opened ticket awaiting human follow-up
    pub fn pending(room_id: RoomId, last_message_text: impl Into<String>) -> Self {
        Self {
            room_id,
            last_message_text: last_message_text.into(),
            status: EscalationStatus::Pending,
            last_resolved_at: None,
        }
    }
}
