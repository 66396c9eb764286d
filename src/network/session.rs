//! Client Session
//!
//! Per-connection state machine: `Connecting -> Registered -> Closed`.
//! A session turns inbound text frames into World Store calls and queued
//! commands, and produces the direct reply (if any) for each frame.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::Game;
use crate::game::input::Command;
use crate::game::state::{Player, PlayerId, WorldError};
use crate::network::hub::SessionId;
use crate::network::protocol::{
    ClientMessage, MoveRequest, ServerMessage, ERR_ALREADY_JOINED, ERR_GRID_FULL,
    ERR_INVALID_MESSAGE, ERR_INVALID_MOVE, ERR_NOT_JOINED,
};

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handshake done, not yet known to the hub.
    Connecting,
    /// Receiving broadcasts.
    Registered,
    /// Torn down.
    Closed,
}

/// One live connection.
#[derive(Debug)]
pub struct ClientSession {
    id: SessionId,
    state: SessionState,
    player: Option<PlayerId>,
    game: Game,
}

impl ClientSession {
    /// New session in the `Connecting` state.
    pub fn new(game: Game) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Connecting,
            player: None,
            game,
        }
    }

    /// Connection id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Player owned by this connection, once joined.
    pub fn player(&self) -> Option<&PlayerId> {
        self.player.as_ref()
    }

    /// The hub accepted this session.
    pub fn mark_registered(&mut self) {
        if self.state == SessionState::Connecting {
            self.state = SessionState::Registered;
        }
    }

    /// Handle one text frame. Returns the direct reply, if any.
    pub async fn handle_text(&mut self, text: &str) -> Option<ServerMessage> {
        if self.state == SessionState::Closed {
            return None;
        }

        let msg = match ClientMessage::from_json(text) {
            Ok(msg) => msg,
            Err(e) => {
                debug!("Invalid message on {}: {}", self.id, e);
                return Some(ServerMessage::error(ERR_INVALID_MESSAGE));
            }
        };

        match msg {
            ClientMessage::Join { name } => Some(self.handle_join(&name).await),
            ClientMessage::Move(req) => self.handle_move(&req),
            ClientMessage::Unknown => None,
        }
    }

    async fn handle_join(&mut self, name: &str) -> ServerMessage {
        if self.player.is_some() {
            return ServerMessage::error(ERR_ALREADY_JOINED);
        }

        match self.game.join(name).await {
            Ok(player) => {
                info!("Session {} joined as {}", self.id, player.id);
                let ack = ServerMessage::join_ack(&player, self.game.grid());
                self.player = Some(player.id);
                ack
            }
            Err(WorldError::GridFull) => {
                warn!("Session {} rejected: grid full", self.id);
                ServerMessage::error(ERR_GRID_FULL)
            }
        }
    }

    fn handle_move(&self, req: &MoveRequest) -> Option<ServerMessage> {
        let Some(player_id) = &self.player else {
            return Some(ServerMessage::error(ERR_NOT_JOINED));
        };
        let Some(action) = req.to_action() else {
            return Some(ServerMessage::error(ERR_INVALID_MOVE));
        };

        self.game.submit(Command {
            player_id: player_id.clone(),
            action,
        });
        None
    }

    /// Tear down: removes the player from the board. Idempotent.
    pub async fn close(&mut self) -> Option<Player> {
        self.state = SessionState::Closed;
        let player_id = self.player.take()?;
        self.game.leave(&player_id).await
    }
}
