use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator placed between the two sorted participant identifiers
pub const ROOM_SEPARATOR: char = '_';

/// Canonical identifier of a two-party conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Derive the shared room of two participants.
    ///
    /// Both participants compute the same value independently, whatever the
    /// argument order. Empty identifiers still yield a deterministic room.
    ///
    /// ```
    /// use concierge_chats::RoomId;
    ///
    /// assert_eq!(RoomId::derive("tenant-7", "owner-3"), RoomId::derive("owner-3", "tenant-7"));
    /// assert_eq!(RoomId::derive("b", "a").as_str(), "a_b");
    /// ```
    pub fn derive(id_a: &str, id_b: &str) -> Self {
        let (first, second) = if id_a <= id_b { (id_a, id_b) } else { (id_b, id_a) };
        Self(format!("{first}{ROOM_SEPARATOR}{second}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RoomId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RoomId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Free-function form of [`RoomId::derive`]
pub fn derive_room(id_a: &str, id_b: &str) -> RoomId {
    RoomId::derive(id_a, id_b)
}
