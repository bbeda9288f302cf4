use serde::{Deserialize, Serialize};

/// Online and typing state of the remote participant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceState {
    pub is_online: bool,
    pub is_typing: bool,
}

/// Display details of a participant, as returned by the profile directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerProfile {
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl PeerProfile {
    /// Profile used when the directory has nothing better to offer
    pub fn fallback(user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            display_name: user_id.clone(),
            user_id,
            avatar_url: None,
        }
    }
}
