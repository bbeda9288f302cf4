//! Message history collaborator.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::entities::{HistoryRecord, RoomId};
use crate::types::{ChatError, ChatResult};

use super::{http_client, join_url};

/// Source of the stored messages of a room
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Fetch the raw history records of `room`, oldest first
    async fn fetch(&self, room: &RoomId) -> ChatResult<Vec<HistoryRecord>>;
}

/// History served by the REST endpoint `GET {base_url}/rooms/{room}/messages`
pub struct HttpHistoryRepository {
    client: reqwest::Client,
    base_url: String,
}

impl HttpHistoryRepository {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> ChatResult<Self> {
        Ok(Self {
            client: http_client(request_timeout)?,
            base_url: base_url.into(),
        })
    }

    fn messages_url(&self, room: &RoomId) -> String {
        join_url(&self.base_url, &format!("rooms/{}/messages", room))
    }
}

#[async_trait]
impl HistoryRepository for HttpHistoryRepository {
    async fn fetch(&self, room: &RoomId) -> ChatResult<Vec<HistoryRecord>> {
        let url = self.messages_url(room);
        debug!(%url, "requesting message history");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::history(format!("history endpoint returned {status}")));
        }

        // Decode row by row so one bad row does not cost the whole history.
        let rows: Vec<Value> = response.json().await?;
        let total = rows.len();
        let records: Vec<HistoryRecord> = rows
            .into_iter()
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect();

        if records.len() < total {
            debug!(room = %room, dropped = total - records.len(), "skipped undecodable history rows");
        }

        Ok(records)
    }
}

/// History kept in memory, for tests and the console
#[derive(Default)]
pub struct InMemoryHistoryRepository {
    rooms: RwLock<HashMap<RoomId, Vec<HistoryRecord>>>,
    failure: RwLock<Option<String>>,
}

impl InMemoryHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append records to the stored history of `room`
    pub async fn seed(&self, room: &RoomId, records: impl IntoIterator<Item = HistoryRecord>) {
        let mut rooms = self.rooms.write().await;
        rooms.entry(room.clone()).or_default().extend(records);
    }

    /// Make every following fetch fail with `message`
    pub async fn fail_with(&self, message: impl Into<String>) {
        *self.failure.write().await = Some(message.into());
    }

    /// Stop failing fetches
    pub async fn recover(&self) {
        *self.failure.write().await = None;
    }
}

#[async_trait]
impl HistoryRepository for InMemoryHistoryRepository {
    async fn fetch(&self, room: &RoomId) -> ChatResult<Vec<HistoryRecord>> {
        if let Some(message) = self.failure.read().await.as_ref() {
            return Err(ChatError::history(message.clone()));
        }

        let rooms = self.rooms.read().await;
        Ok(rooms.get(room).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sender: &str, body: &str) -> HistoryRecord {
        HistoryRecord {
            sender: Some(sender.to_string()),
            receiver: Some("someone".to_string()),
            body: Some(body.to_string()),
            ..HistoryRecord::default()
        }
    }

    #[tokio::test]
    async fn in_memory_history_is_scoped_per_room() {
        let repository = InMemoryHistoryRepository::new();
        let room = RoomId::derive("alice", "bob");
        let other = RoomId::derive("alice", "carol");

        repository.seed(&room, vec![record("bob", "one"), record("alice", "two")]).await;

        assert_eq!(repository.fetch(&room).await.unwrap().len(), 2);
        assert!(repository.fetch(&other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn in_memory_history_can_simulate_outages() {
        let repository = InMemoryHistoryRepository::new();
        let room = RoomId::derive("alice", "bob");

        repository.fail_with("service unavailable").await;
        let error = repository.fetch(&room).await.unwrap_err();
        assert!(matches!(error, ChatError::History { .. }));

        repository.recover().await;
        assert!(repository.fetch(&room).await.is_ok());
    }

    #[test]
    fn messages_url_joins_cleanly() {
        let repository = HttpHistoryRepository::new("http://localhost:7070/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            repository.messages_url(&RoomId::derive("b", "a")),
            "http://localhost:7070/api/rooms/a_b/messages"
        );
    }
}
