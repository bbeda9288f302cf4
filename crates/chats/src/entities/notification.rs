use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A transient notice surfaced to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}
