//! ChatWave: a room-scoped chat message relay.
//!
//! Authenticated users join a numbered room and exchange short text messages
//! with everyone currently in it. The pieces, leaf first: the
//! [`registry::ConnectionRegistry`] tracks which connection belongs to which
//! room, the [`relay::RoomRelay`] fans messages and membership announcements
//! out to the right set of connections, and [`session`] plus [`api`] wire
//! that up to websockets. Messages are never stored; a room exists exactly
//! as long as someone is in it.

pub mod api;
pub mod config;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod session;

pub use config::Config;
pub use protocol::{Ack, ClientIntent, Reject, RoomId, ServerEvent};
pub use registry::{ConnectionId, ConnectionRegistry};
pub use relay::RoomRelay;
