//! The other side of the console conversation, played straight onto the channel.

use anyhow::{Context, Result};
use concierge_chats::types::{NoticeEvent, TypingEvent};
use concierge_chats::{ChatMessage, EventChannel, LocalEventChannel, RoomEvent, RoomId};
use tracing::debug;

/// Publishes the peer's events into the room without running a session for it,
/// so nothing answers or escalates on the peer's behalf.
pub struct PeerDriver {
    channel: LocalEventChannel,
    room: RoomId,
    peer_id: String,
    user_id: String,
}

impl PeerDriver {
    pub fn new(channel: LocalEventChannel, peer_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        let peer_id = peer_id.into();
        let user_id = user_id.into();
        Self {
            room: RoomId::derive(&peer_id, &user_id),
            channel,
            peer_id,
            user_id,
        }
    }

    /// Announce the peer as online
    pub async fn join(&self) -> Result<()> {
        self.channel
            .join(&self.room, &self.peer_id)
            .await
            .context("peer could not join the room")
    }

    pub async fn start_typing(&self) -> Result<()> {
        self.typing(true).await
    }

    /// Stop typing and deliver `text` as a message from the peer
    pub async fn say(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        self.typing(false).await?;
        let message = ChatMessage::new(
            self.peer_id.clone(),
            self.user_id.clone(),
            self.room.clone(),
            text,
        );
        debug!(room = %self.room, id = %message.id, "peer message published");
        self.publish(RoomEvent::NewMessage(message)).await
    }

    pub async fn notice(&self, text: &str) -> Result<()> {
        self.publish(RoomEvent::Notification(NoticeEvent {
            sender: self.peer_id.clone(),
            body: text.trim().to_string(),
        }))
        .await
    }

    pub async fn leave(&self) -> Result<()> {
        self.channel
            .leave(&self.room, &self.peer_id)
            .await
            .context("peer could not leave the room")
    }

    async fn typing(&self, is_typing: bool) -> Result<()> {
        self.publish(RoomEvent::Typing(TypingEvent {
            user_id: self.peer_id.clone(),
            is_typing,
        }))
        .await
    }

    async fn publish(&self, event: RoomEvent) -> Result<()> {
        self.channel
            .publish(&self.room, event)
            .await
            .with_context(|| format!("failed to publish peer event to room {}", self.room))
    }
}
