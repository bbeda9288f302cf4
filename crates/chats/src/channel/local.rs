//! In-process event channel backed by tokio broadcast senders.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::entities::RoomId;
use crate::types::{ChatError, ChatResult, EventKind, PresenceEvent, RoomEvent};

use super::EventChannel;

type Topic = (RoomId, EventKind);

#[derive(Default)]
struct Faults {
    publish: Option<String>,
    subscribe: Option<EventKind>,
}

/// Event channel that fans events out to subscribers in the same process.
///
/// Joining and leaving a room emit presence events for the participant, the
/// way a socket server reports connects and disconnects.
#[derive(Clone)]
pub struct LocalEventChannel {
    capacity: usize,
    topics: Arc<RwLock<HashMap<Topic, broadcast::Sender<RoomEvent>>>>,
    subscribers: Arc<RwLock<HashMap<Topic, usize>>>,
    faults: Arc<RwLock<Faults>>,
}

impl LocalEventChannel {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            topics: Arc::new(RwLock::new(HashMap::new())),
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            faults: Arc::new(RwLock::new(Faults::default())),
        }
    }

    /// Get or create the broadcaster for one room and kind
    async fn topic(&self, room: &RoomId, kind: EventKind) -> broadcast::Sender<RoomEvent> {
        let mut topics = self.topics.write().await;
        topics
            .entry((room.clone(), kind))
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Number of live subscriptions for a room and kind
    pub async fn subscriber_count(&self, room: &RoomId, kind: EventKind) -> usize {
        self.subscribers
            .read()
            .await
            .get(&(room.clone(), kind))
            .copied()
            .unwrap_or(0)
    }

    /// Make every following publish fail with `message`, or heal with `None`
    pub async fn fail_publishes(&self, message: Option<String>) {
        self.faults.write().await.publish = message;
    }

    /// Make subscriptions to `kind` fail, or heal with `None`
    pub async fn fail_subscriptions_to(&self, kind: Option<EventKind>) {
        self.faults.write().await.subscribe = kind;
    }
}

impl Default for LocalEventChannel {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl EventChannel for LocalEventChannel {
    async fn join(&self, room: &RoomId, user_id: &str) -> ChatResult<()> {
        debug!(room = %room, user_id, "participant joined room");
        self.publish(
            room,
            RoomEvent::Presence(PresenceEvent {
                user_id: user_id.to_string(),
                is_online: true,
            }),
        )
        .await
        .map_err(|error| ChatError::join(room.to_string(), error.to_string()))
    }

    async fn leave(&self, room: &RoomId, user_id: &str) -> ChatResult<()> {
        debug!(room = %room, user_id, "participant left room");
        self.publish(
            room,
            RoomEvent::Presence(PresenceEvent {
                user_id: user_id.to_string(),
                is_online: false,
            }),
        )
        .await
    }

    async fn publish(&self, room: &RoomId, event: RoomEvent) -> ChatResult<()> {
        if let Some(message) = self.faults.read().await.publish.clone() {
            return Err(ChatError::publish(message));
        }

        let sender = self.topic(room, event.kind()).await;
        // Nobody listening is not a delivery failure.
        let receivers = sender.send(event).unwrap_or(0);
        debug!(room = %room, receivers, "event published");
        Ok(())
    }

    async fn subscribe(
        &self,
        room: &RoomId,
        kind: EventKind,
    ) -> ChatResult<broadcast::Receiver<RoomEvent>> {
        if self.faults.read().await.subscribe == Some(kind) {
            return Err(ChatError::subscribe(kind, "channel refused the subscription"));
        }

        let receiver = self.topic(room, kind).await.subscribe();
        *self
            .subscribers
            .write()
            .await
            .entry((room.clone(), kind))
            .or_insert(0) += 1;
        Ok(receiver)
    }

    async fn unsubscribe(&self, room: &RoomId, kind: EventKind) -> ChatResult<()> {
        let mut subscribers = self.subscribers.write().await;
        if let Some(count) = subscribers.get_mut(&(room.clone(), kind)) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                subscribers.remove(&(room.clone(), kind));
            }
        }
        Ok(())
    }
}
