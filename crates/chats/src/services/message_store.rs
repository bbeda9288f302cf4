//! Ordered message collection of one room.

use chrono::NaiveDate;
use tracing::debug;

use crate::entities::{ChatMessage, RoomId};
use crate::repositories::HistoryRepository;
use crate::types::ChatResult;

/// A run of consecutive messages sent on the same day
#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub day: NaiveDate,
    pub messages: Vec<ChatMessage>,
}

/// Messages of a room in arrival order.
///
/// Order is insertion order, never timestamp order: optimistic sends, peer
/// messages and bot replies may carry clocks that disagree.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<ChatMessage>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored messages with the history of `room`.
    ///
    /// Records without sender, receiver or body are dropped. On failure the
    /// store is left empty and the error is returned to the caller.
    pub async fn load_history(
        &mut self,
        history: &dyn HistoryRepository,
        room: &RoomId,
    ) -> ChatResult<usize> {
        self.messages.clear();

        let records = history.fetch(room).await?;
        let total = records.len();
        self.messages = records
            .into_iter()
            .filter_map(|record| record.into_message(room))
            .collect();

        let dropped = total - self.messages.len();
        if dropped > 0 {
            debug!(room = %room, dropped, "discarded malformed history records");
        }

        Ok(self.messages.len())
    }

    /// Add a message at the end
    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Check whether a message with this id is already stored
    pub fn contains(&self, message_id: &str) -> bool {
        self.messages.iter().any(|message| message.id == message_id)
    }

    /// Flag every message as read, returning how many changed
    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for message in self.messages.iter_mut().filter(|message| !message.read) {
            message.read = true;
            changed += 1;
        }
        changed
    }

    pub fn unread_count(&self) -> usize {
        self.messages.iter().filter(|message| !message.read).count()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Split the messages into runs by calendar day for day separators.
    ///
    /// A day can appear in more than one run when clocks disagree, because
    /// grouping never reorders.
    pub fn day_groups(&self) -> Vec<DayGroup> {
        let mut groups: Vec<DayGroup> = Vec::new();
        for message in &self.messages {
            let day = message.day();
            match groups.last_mut() {
                Some(group) if group.day == day => group.messages.push(message.clone()),
                _ => groups.push(DayGroup {
                    day,
                    messages: vec![message.clone()],
                }),
            }
        }
        groups
    }
}
