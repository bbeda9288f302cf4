//! Presence and typing state of the remote participant.

use tracing::debug;

use crate::entities::PresenceState;

/// Tracks the remote peer's online and typing flags.
///
/// Updates are purely reactive. Events about anyone but the tracked peer
/// are ignored, and typing state is never cleared by a timeout on this side.
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    peer_id: String,
    state: PresenceState,
}

impl PresenceTracker {
    pub fn new(peer_id: impl Into<String>) -> Self {
        Self {
            peer_id: peer_id.into(),
            state: PresenceState::default(),
        }
    }

    /// Apply a typing event, returning whether it concerned the peer
    pub fn on_peer_typing(&mut self, peer_id: &str, is_typing: bool) -> bool {
        if peer_id != self.peer_id {
            return false;
        }
        debug!(peer_id, is_typing, "peer typing state changed");
        self.state.is_typing = is_typing;
        true
    }

    /// Apply a presence event, returning whether it concerned the peer
    pub fn on_peer_online(&mut self, peer_id: &str, is_online: bool) -> bool {
        if peer_id != self.peer_id {
            return false;
        }
        debug!(peer_id, is_online, "peer presence changed");
        self.state.is_online = is_online;
        true
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }
}
