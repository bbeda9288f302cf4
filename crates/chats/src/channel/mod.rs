//! Publish/subscribe channel the session exchanges room events over.

pub mod local;

pub use local::LocalEventChannel;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::entities::RoomId;
use crate::types::{ChatResult, EventKind, RoomEvent};

/// Bidirectional event channel scoped by room.
///
/// Delivery order is preserved within one event kind only.
#[async_trait]
pub trait EventChannel: Send + Sync {
    /// Announce `user_id` as a participant of `room`
    async fn join(&self, room: &RoomId, user_id: &str) -> ChatResult<()>;

    /// Withdraw `user_id` from `room`
    async fn leave(&self, room: &RoomId, user_id: &str) -> ChatResult<()>;

    /// Publish an event to every subscriber of its kind in `room`
    async fn publish(&self, room: &RoomId, event: RoomEvent) -> ChatResult<()>;

    /// Start receiving events of `kind` from `room`
    async fn subscribe(
        &self,
        room: &RoomId,
        kind: EventKind,
    ) -> ChatResult<broadcast::Receiver<RoomEvent>>;

    /// Release a subscription taken with [`EventChannel::subscribe`]
    async fn unsubscribe(&self, room: &RoomId, kind: EventKind) -> ChatResult<()>;
}
