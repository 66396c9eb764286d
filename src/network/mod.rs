//! Network Layer
//!
//! WebSocket server for real-time multiplayer communication.
//! Game rules live in `game/`; this layer only moves messages.

pub mod emitter;
pub mod hub;
pub mod protocol;
pub mod server;
pub mod session;

pub use emitter::{BroadcastEmitter, Broadcasts, Payload};
pub use hub::{Hub, HubCommand, HubHandle, SessionId};
pub use protocol::{ClientMessage, MatchEvent, MoveRequest, ServerMessage, StateUpdate};
pub use server::{GameServer, GameServerError, ServerConfig};
pub use session::{ClientSession, SessionState};
