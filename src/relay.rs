//! Room-scoped fan-out of chat messages and membership announcements.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{mpsc, RwLock};
use warp::ws::Message;

use crate::protocol::{Ack, ClientIntent, Reject, RoomId, ServerEvent};
use crate::registry::{ConnectionId, ConnectionRegistry};

/// Outbound frame channel for one connection. Sends never await: each
/// connection's session loop owns a writer task that drains the channel
/// through the socket, so fan-out is fire-and-forget.
pub type OutboundSender = mpsc::UnboundedSender<Message>;

#[derive(Default)]
struct RelayState {
    registry: ConnectionRegistry,
    senders: HashMap<ConnectionId, OutboundSender>,
}

/// Translates inbound client intents into registry mutations and outbound
/// broadcasts.
///
/// One relay exists per process, created in `main` and injected into the
/// transport layer. All intent handling takes the single write lock, which
/// serializes registry mutation and fan-out exactly like a single-threaded
/// event loop would: per room, events reach every member in the order the
/// relay processed the triggering intents.
pub struct RoomRelay {
    state: RwLock<RelayState>,
    next_connection_id: AtomicUsize,
}

impl Default for RoomRelay {
    fn default() -> RoomRelay {
        RoomRelay::new()
    }
}

impl RoomRelay {
    pub fn new() -> RoomRelay {
        RoomRelay {
            state: RwLock::new(RelayState::default()),
            next_connection_id: AtomicUsize::new(1),
        }
    }

    /// Register a freshly opened transport connection and hand back its id.
    /// The connection is unbound until its first accepted join.
    pub async fn connect(&self, tx: OutboundSender) -> ConnectionId {
        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        self.state.write().await.senders.insert(id, tx);
        log::info!("connection {} opened", id);
        id
    }

    /// Drop a connection: release its room binding and forget its sender.
    /// Idempotent, and deliberately silent: joins are announced, departures
    /// by disconnect are not.
    pub async fn disconnect(&self, id: ConnectionId) {
        let mut state = self.state.write().await;
        state.senders.remove(&id);
        match state.registry.unbind(id) {
            Some(binding) => log::info!(
                "connection {} closed, left room {} ({})",
                id,
                binding.room,
                binding.username
            ),
            None => log::debug!("connection {} closed", id),
        }
    }

    /// Process one intent from `id`. Rejections are returned to the caller
    /// and also sent back over the connection's own channel as a `rejected`
    /// event, never silently dropped.
    pub async fn handle_intent(
        &self,
        id: ConnectionId,
        intent: ClientIntent,
    ) -> Result<Ack, Reject> {
        let result = match intent {
            ClientIntent::JoinRoom { room, username } => self.join(id, room, username).await,
            // The sender field on the wire is advisory; the registry's
            // recorded display name is authoritative for attribution.
            ClientIntent::Message { room, message, .. } => self.message(id, room, message).await,
        };
        if let Err(reason) = &result {
            self.reject(id, *reason).await;
        }
        result
    }

    async fn join(
        &self,
        id: ConnectionId,
        room: RoomId,
        username: String,
    ) -> Result<Ack, Reject> {
        let room = room.trimmed().ok_or(Reject::EmptyRoom)?;
        let username = username.trim();
        if username.is_empty() {
            return Err(Reject::EmptyUsername);
        }
        let username = username.to_owned();

        let mut state = self.state.write().await;
        let previous = state.registry.bind(id, room.clone(), username.clone());

        // Room switch: the old room hears a departure announcement symmetric
        // to the join announcement the new room is about to get.
        if let Some(previous) = previous {
            if previous.room != room {
                state.broadcast(&previous.room, &ServerEvent::left(&previous.username));
                log::info!(
                    "connection {} switched from room {} to {}",
                    id,
                    previous.room,
                    room
                );
            }
        }

        let notified = state.broadcast(&room, &ServerEvent::joined(&username));
        log::info!(
            "connection {} joined room {} as {} ({} members notified)",
            id,
            room,
            username,
            notified
        );
        Ok(Ack::Joined { room })
    }

    async fn message(
        &self,
        id: ConnectionId,
        room: RoomId,
        message: String,
    ) -> Result<Ack, Reject> {
        let room = room.trimmed().ok_or(Reject::EmptyRoom)?;
        // The client refuses to send whitespace-only input, but the relay
        // re-validates rather than trusting it. The body is otherwise passed
        // through untouched so recipients get it byte-identical.
        if message.trim().is_empty() {
            return Err(Reject::EmptyMessage);
        }

        let state = self.state.write().await;
        let sender = match state.registry.binding(id) {
            Some(binding) if binding.room == room => binding.username.clone(),
            _ => return Err(Reject::NotAMember),
        };

        let event = ServerEvent::Message { sender, message };
        let recipients = state.broadcast(&room, &event);
        log::trace!(
            "connection {} delivered to {} members of room {}: {:?}",
            id,
            recipients,
            room,
            event
        );
        Ok(Ack::Delivered { recipients })
    }

    /// Send a `rejected` event to a single connection.
    pub(crate) async fn reject(&self, id: ConnectionId, reason: Reject) {
        log::debug!("connection {} intent rejected: {}", id, reason);
        let state = self.state.read().await;
        if let Some(tx) = state.senders.get(&id) {
            send_event(tx, &ServerEvent::Rejected { reason });
        }
    }

    /// Number of connections currently bound to `room`.
    pub async fn member_count(&self, room: &RoomId) -> usize {
        self.state.read().await.registry.member_count(room)
    }
}

impl RelayState {
    /// Deliver `event` to every current member of `room`, returning how many
    /// sends were accepted. Membership is read at this instant, under the
    /// same lock the caller mutated it with.
    fn broadcast(&self, room: &RoomId, event: &ServerEvent) -> usize {
        let frame = match serde_json::to_string(event) {
            Ok(json) => Message::text(json),
            Err(err) => {
                log::warn!("failed to encode event for room {}: {}", room, err);
                return 0;
            }
        };

        let mut recipients = 0;
        for member in self.registry.members_of(room) {
            let tx = match self.senders.get(&member) {
                Some(tx) => tx,
                None => continue,
            };
            // A failed send means that member's session loop is tearing
            // down; its own disconnect path cleans up. The rest of the
            // fan-out proceeds.
            if tx.send(frame.clone()).is_ok() {
                recipients += 1;
            }
        }
        recipients
    }
}

fn send_event(tx: &OutboundSender, event: &ServerEvent) {
    match serde_json::to_string(event) {
        Ok(json) => {
            let _ = tx.send(Message::text(json));
        }
        Err(err) => log::warn!("failed to encode event: {}", err),
    }
}
