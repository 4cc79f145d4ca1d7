//! Wire-level types for the chat relay.
//!
//! Frames are JSON text messages shaped `{"event": ..., "data": ...}`, the
//! same `(event, payload)` pairs the browser client emits and listens on.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Reserved sender name for relay-generated membership announcements.
pub const SYSTEM_SENDER: &str = "system";

/// Opaque room identifier.
///
/// Room codes are numeric in the UI, but nothing in the relay cares: the wire
/// accepts either a JSON string or a number, and numbers are normalized to
/// their decimal form so `7` and `"7"` name the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RoomId(String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trimmed copy, or `None` when nothing but whitespace remains.
    pub fn trimmed(&self) -> Option<RoomId> {
        let trimmed = self.0.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(RoomId(trimmed.to_owned()))
        }
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        RoomId(value.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(value: String) -> Self {
        RoomId(value)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RoomId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => RoomId(n.to_string()),
            Raw::Text(s) => RoomId(s),
        })
    }
}

/// An inbound intent from a client connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientIntent {
    /// Bind the connection to a room. Re-joining a different room releases
    /// the previous binding first.
    #[serde(rename = "join-room")]
    JoinRoom { room: RoomId, username: String },
    /// Broadcast a chat message to everyone in the room, sender included.
    ///
    /// The `sender` field is advisory; the display name recorded at join
    /// time is what recipients see.
    #[serde(rename = "message")]
    Message {
        room: RoomId,
        message: String,
        sender: String,
    },
}

/// An outbound event delivered to client connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "message")]
    Message { sender: String, message: String },
    #[serde(rename = "user_joined")]
    UserJoined { sender: String, message: String },
    #[serde(rename = "user_left")]
    UserLeft { sender: String, message: String },
    /// The previous intent from this connection was refused. Sent only to
    /// the connection that emitted the intent, never broadcast.
    #[serde(rename = "rejected")]
    Rejected { reason: Reject },
}

impl ServerEvent {
    /// Membership announcement broadcast when `username` joins a room.
    pub fn joined(username: &str) -> ServerEvent {
        ServerEvent::UserJoined {
            sender: SYSTEM_SENDER.to_owned(),
            message: format!("{} joined the room", username),
        }
    }

    /// Membership announcement broadcast to a room the user switched away from.
    pub fn left(username: &str) -> ServerEvent {
        ServerEvent::UserLeft {
            sender: SYSTEM_SENDER.to_owned(),
            message: format!("{} left the room", username),
        }
    }
}

/// Why an intent was refused. The wire form is the snake_case variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum Reject {
    #[error("room must not be empty")]
    EmptyRoom,
    #[error("username must not be empty")]
    EmptyUsername,
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("sender is not a member of the target room")]
    NotAMember,
    #[error("intent could not be parsed")]
    Malformed,
}

/// Successful outcome of an intent, for callers that want to observe it.
/// Never serialized; the wire-visible effect is the broadcast itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    Joined { room: RoomId },
    Delivered { recipients: usize },
}
