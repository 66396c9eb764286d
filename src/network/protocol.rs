//! Protocol Messages
//!
//! JSON wire format for client-server communication over WebSocket.
//! Every message is an object with a `type` discriminator.

use serde::{Deserialize, Serialize};

use crate::core::grid::{Cell, Direction, GridSize};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::input::MoveAction;
use crate::game::state::{FinalScore, Player, PlayerId, Sweet, SweetId, WorldSnapshot};

/// Error reply text for a move sent before joining.
pub const ERR_NOT_JOINED: &str = "not joined";
/// Error reply text for a second join on the same connection.
pub const ERR_ALREADY_JOINED: &str = "already joined";
/// Error reply text for a move with neither `dir` nor `x`/`y`.
pub const ERR_INVALID_MOVE: &str = "invalid move";
/// Error reply text for unparseable input.
pub const ERR_INVALID_MESSAGE: &str = "invalid message";
/// Error reply text when the board has no room for another player.
pub const ERR_GRID_FULL: &str = "unable to add player";

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Enter the board.
    Join {
        /// Display name
        #[serde(default)]
        name: String,
    },

    /// Movement intent for the next tick.
    Move(MoveRequest),

    /// Any other `type`. Ignored.
    #[serde(other)]
    Unknown,
}

/// Body of a `move` message: either `dir` or absolute `x`/`y`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    /// One-cell step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<Direction>,
    /// Absolute column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i64>,
    /// Absolute row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i64>,
}

impl MoveRequest {
    /// Resolve to an action. `dir` wins when both forms are present.
    pub fn to_action(&self) -> Option<MoveAction> {
        match (self.dir, self.x, self.y) {
            (Some(dir), _, _) => Some(MoveAction::Step(dir)),
            (None, Some(x), Some(y)) => Some(MoveAction::Goto { x, y }),
            _ => None,
        }
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Join accepted.
    JoinAck {
        /// Assigned player id
        id: PlayerId,
        /// Starting cell
        pos: Cell,
        /// Board size
        grid: GridSize,
    },

    /// Full board, once per tick.
    State(StateUpdate),

    /// Discrete event.
    Event(MatchEvent),

    /// Round finished.
    GameOver {
        /// Every live player, best first
        scores: Vec<FinalScore>,
    },

    /// Request rejected.
    Error {
        /// Human-readable reason
        message: String,
    },
}

/// Per-tick board snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    /// Tick that produced it
    pub tick: u64,
    /// Every live player
    pub players: Vec<Player>,
    /// Every live collectible
    pub sweets: Vec<Sweet>,
}

/// Discrete events carried by `type: "event"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MatchEvent {
    /// A player picked up a collectible.
    Collected {
        /// Collector
        player: PlayerId,
        /// Collectible taken
        sweet: SweetId,
        /// Tick of the pickup
        tick: u64,
    },
}

impl From<WorldSnapshot> for StateUpdate {
    fn from(snapshot: WorldSnapshot) -> Self {
        Self {
            tick: snapshot.tick,
            players: snapshot.players,
            sweets: snapshot.sweets,
        }
    }
}

impl From<&GameEvent> for ServerMessage {
    fn from(event: &GameEvent) -> Self {
        match &event.data {
            GameEventData::SweetCollected { player_id, sweet_id } => {
                ServerMessage::Event(MatchEvent::Collected {
                    player: player_id.clone(),
                    sweet: sweet_id.clone(),
                    tick: event.tick,
                })
            }
            GameEventData::RoundOver { scores } => ServerMessage::GameOver {
                scores: scores.clone(),
            },
        }
    }
}

impl ServerMessage {
    /// Join acknowledgement for a freshly placed player.
    pub fn join_ack(player: &Player, grid: GridSize) -> Self {
        ServerMessage::JoinAck {
            id: player.id.clone(),
            pos: player.cell(),
            grid,
        }
    }

    /// Error reply.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn as_value(msg: &ServerMessage) -> Value {
        serde_json::from_str(&msg.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_parse_join() {
        let msg = ClientMessage::from_json(r#"{"type":"join","name":"Ann"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Join { name: "Ann".into() });

        let msg = ClientMessage::from_json(r#"{"type":"join"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Join { name: String::new() });
    }

    #[test]
    fn test_parse_move_forms() {
        let msg = ClientMessage::from_json(r#"{"type":"move","dir":"left"}"#).unwrap();
        let ClientMessage::Move(req) = msg else {
            panic!("Wrong message type");
        };
        assert_eq!(req.to_action(), Some(MoveAction::Step(Direction::Left)));

        let msg = ClientMessage::from_json(r#"{"type":"move","x":3,"y":-1}"#).unwrap();
        let ClientMessage::Move(req) = msg else {
            panic!("Wrong message type");
        };
        assert_eq!(req.to_action(), Some(MoveAction::Goto { x: 3, y: -1 }));

        let msg = ClientMessage::from_json(r#"{"type":"move","x":3}"#).unwrap();
        let ClientMessage::Move(req) = msg else {
            panic!("Wrong message type");
        };
        assert_eq!(req.to_action(), None);
    }

    #[test]
    fn test_unknown_type_is_tolerated() {
        let msg = ClientMessage::from_json(r#"{"type":"chat","text":"hi"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Unknown);
    }

    #[test]
    fn test_malformed_rejected() {
        assert!(ClientMessage::from_json("not json").is_err());
        assert!(ClientMessage::from_json(r#"{"name":"no type"}"#).is_err());
        assert!(ClientMessage::from_json(r#"{"type":"move","dir":"north"}"#).is_err());
    }

    #[test]
    fn test_join_ack_wire_shape() {
        let player = Player::new(PlayerId::new("p-1"), "Ann", Cell::new(2, 3));
        let msg = ServerMessage::join_ack(&player, GridSize::new(10, 8));

        assert_eq!(
            as_value(&msg),
            json!({"type": "join_ack", "id": "p-1", "pos": {"x": 2, "y": 3}, "grid": {"w": 10, "h": 8}})
        );
    }

    #[test]
    fn test_state_wire_shape() {
        let snapshot = WorldSnapshot {
            tick: 7,
            players: vec![Player::new(PlayerId::new("p-1"), "Ann", Cell::new(0, 1))],
            sweets: vec![Sweet::new(SweetId::new("s4"), Cell::new(5, 5))],
        };
        let msg = ServerMessage::State(snapshot.into());

        assert_eq!(
            as_value(&msg),
            json!({
                "type": "state",
                "tick": 7,
                "players": [{"id": "p-1", "name": "Ann", "x": 0, "y": 1, "score": 0}],
                "sweets": [{"id": "s4", "x": 5, "y": 5}],
            })
        );
    }

    #[test]
    fn test_event_wire_shapes() {
        let collected = GameEvent::sweet_collected(12, PlayerId::new("p-2"), SweetId::new("s1"));
        assert_eq!(
            as_value(&ServerMessage::from(&collected)),
            json!({"type": "event", "event": "collected", "player": "p-2", "sweet": "s1", "tick": 12})
        );

        let over = GameEvent::round_over(
            12,
            vec![FinalScore {
                id: PlayerId::new("p-2"),
                name: "Bo".into(),
                score: 3,
            }],
        );
        assert_eq!(
            as_value(&ServerMessage::from(&over)),
            json!({"type": "game_over", "scores": [{"id": "p-2", "name": "Bo", "score": 3}]})
        );

        assert_eq!(
            as_value(&ServerMessage::error(ERR_NOT_JOINED)),
            json!({"type": "error", "message": "not joined"})
        );
    }

    #[test]
    fn test_server_message_json_roundtrip() {
        let msg = ServerMessage::Event(MatchEvent::Collected {
            player: PlayerId::new("p-9"),
            sweet: SweetId::new("s3"),
            tick: 500,
        });

        let parsed = ServerMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert_eq!(parsed, msg);
    }
}
