//! Authoritative mapping of live connections to rooms.

use std::collections::{HashMap, HashSet};

use crate::protocol::RoomId;

/// Process-local handle for one open transport session, assigned by the
/// relay when the socket opens.
pub type ConnectionId = usize;

/// What a connection is bound to: the one room it belongs to and the display
/// name recorded when it joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub room: RoomId,
    pub username: String,
}

/// Connection→room and room→members maps.
///
/// Plain data with no locking of its own: the relay serializes every mutation
/// behind a single lock, so each broadcast observes a consistent snapshot.
/// Rooms exist only while at least one connection is bound to them; the room
/// key is dropped the moment its member set drains.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    bindings: HashMap<ConnectionId, Binding>,
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> ConnectionRegistry {
        ConnectionRegistry::default()
    }

    /// Bind `id` to `room`, releasing any previous binding first so a
    /// connection is never a member of two rooms. Returns the previous
    /// binding, if any, so the caller can announce the departure.
    ///
    /// Inputs arrive pre-validated (non-empty after trimming).
    pub fn bind(&mut self, id: ConnectionId, room: RoomId, username: String) -> Option<Binding> {
        let previous = self.unbind(id);
        self.rooms.entry(room.clone()).or_default().insert(id);
        self.bindings.insert(id, Binding { room, username });
        previous
    }

    /// Release `id`'s binding, if any. Idempotent: safe to call again from
    /// both an explicit leave and the disconnect path.
    pub fn unbind(&mut self, id: ConnectionId) -> Option<Binding> {
        let binding = self.bindings.remove(&id)?;
        if let Some(members) = self.rooms.get_mut(&binding.room) {
            members.remove(&id);
            if members.is_empty() {
                self.rooms.remove(&binding.room);
            }
        }
        Some(binding)
    }

    pub fn binding(&self, id: ConnectionId) -> Option<&Binding> {
        self.bindings.get(&id)
    }

    /// Connections currently bound to `room`; empty for a room nobody
    /// occupies. No duplicates by construction.
    pub fn members_of<'a>(&'a self, room: &RoomId) -> impl Iterator<Item = ConnectionId> + 'a {
        self.rooms.get(room).into_iter().flatten().copied()
    }

    pub fn member_count(&self, room: &RoomId) -> usize {
        self.rooms.get(room).map_or(0, HashSet::len)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
