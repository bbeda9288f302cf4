//! Peer profile lookup.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::RwLock;

use crate::entities::PeerProfile;
use crate::types::{ChatError, ChatResult};

use super::{http_client, join_url};

/// Directory of participant display details
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// Look up a user, `Ok(None)` when the user is unknown
    async fn lookup(&self, user_id: &str) -> ChatResult<Option<PeerProfile>>;
}

/// Profiles served by `GET {base_url}/users/{user_id}`
pub struct HttpProfileDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProfileDirectory {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> ChatResult<Self> {
        Ok(Self {
            client: http_client(request_timeout)?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl ProfileDirectory for HttpProfileDirectory {
    async fn lookup(&self, user_id: &str) -> ChatResult<Option<PeerProfile>> {
        let url = join_url(&self.base_url, &format!("users/{user_id}"));
        let response = self.client.get(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(ChatError::profile(format!("profile endpoint returned {status}"))),
        }
    }
}

/// Profiles kept in memory
#[derive(Default)]
pub struct InMemoryProfileDirectory {
    profiles: RwLock<HashMap<String, PeerProfile>>,
}

impl InMemoryProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, profile: PeerProfile) {
        self.profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
    }
}

#[async_trait]
impl ProfileDirectory for InMemoryProfileDirectory {
    async fn lookup(&self, user_id: &str) -> ChatResult<Option<PeerProfile>> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }
}
