//! Broadcast Emitter
//!
//! Turns tick output into serialized payloads and pushes them into two
//! bounded outbound channels: one for per-tick snapshots, one for discrete
//! events. Sends never wait; a full channel drops the payload and clients
//! catch up on the next snapshot.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, trace};

use crate::game::events::GameEvent;
use crate::game::state::WorldSnapshot;
use crate::network::protocol::ServerMessage;

/// Serialized message shared by every recipient.
pub type Payload = Arc<str>;

/// Default capacity of each outbound channel.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 10;

/// Receiving ends of the emitter, consumed by the forwarders.
#[derive(Debug)]
pub struct Broadcasts {
    /// One payload per tick
    pub states: mpsc::Receiver<Payload>,
    /// Collected and game-over payloads
    pub events: mpsc::Receiver<Payload>,
}

/// Producer side, owned by the tick loop.
#[derive(Debug, Clone)]
pub struct BroadcastEmitter {
    states: mpsc::Sender<Payload>,
    events: mpsc::Sender<Payload>,
}

impl BroadcastEmitter {
    /// Create the emitter and its receivers.
    pub fn channel(capacity: usize) -> (Self, Broadcasts) {
        let capacity = capacity.max(1);
        let (states_tx, states_rx) = mpsc::channel(capacity);
        let (events_tx, events_rx) = mpsc::channel(capacity);

        (
            Self {
                states: states_tx,
                events: events_tx,
            },
            Broadcasts {
                states: states_rx,
                events: events_rx,
            },
        )
    }

    /// Emit a discrete event. Returns false if it was dropped.
    pub fn emit_event(&self, event: &GameEvent) -> bool {
        Self::offer(&self.events, &ServerMessage::from(event), "event")
    }

    /// Emit the end-of-tick snapshot. Returns false if it was dropped.
    pub fn emit_snapshot(&self, snapshot: WorldSnapshot) -> bool {
        Self::offer(&self.states, &ServerMessage::State(snapshot.into()), "state")
    }

    fn offer(tx: &mpsc::Sender<Payload>, msg: &ServerMessage, kind: &str) -> bool {
        let payload: Payload = match msg.to_json() {
            Ok(json) => json.into(),
            Err(e) => {
                error!("Failed to serialize {}: {}", kind, e);
                return false;
            }
        };

        match tx.try_send(payload) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!("Broadcast channel full, dropped {}", kind);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{PlayerId, SweetId};

    fn snapshot(tick: u64) -> WorldSnapshot {
        WorldSnapshot {
            tick,
            players: vec![],
            sweets: vec![],
        }
    }

    #[test]
    fn test_snapshot_serialized() {
        let (emitter, mut rx) = BroadcastEmitter::channel(4);

        assert!(emitter.emit_snapshot(snapshot(3)));
        let payload = rx.states.try_recv().unwrap();
        assert_eq!(&*payload, r#"{"type":"state","tick":3,"players":[],"sweets":[]}"#);
        assert!(rx.events.try_recv().is_err());
    }

    #[test]
    fn test_events_go_to_event_channel() {
        let (emitter, mut rx) = BroadcastEmitter::channel(4);
        let event = GameEvent::sweet_collected(1, PlayerId::new("p-1"), SweetId::new("s1"));

        assert!(emitter.emit_event(&event));
        let payload = rx.events.try_recv().unwrap();
        assert!(payload.contains(r#""event":"collected""#));
        assert!(rx.states.try_recv().is_err());
    }

    #[test]
    fn test_full_channel_drops_without_blocking() {
        let (emitter, mut rx) = BroadcastEmitter::channel(2);

        let sent = (0..50).filter(|t| emitter.emit_snapshot(snapshot(*t))).count();
        assert_eq!(sent, 2);

        // Oldest payloads kept, later ones dropped
        assert!(rx.states.try_recv().unwrap().contains(r#""tick":0"#));
        assert!(rx.states.try_recv().unwrap().contains(r#""tick":1"#));
        assert!(rx.states.try_recv().is_err());
    }

    #[test]
    fn test_closed_receiver() {
        let (emitter, rx) = BroadcastEmitter::channel(2);
        drop(rx);
        assert!(!emitter.emit_snapshot(snapshot(0)));
    }
}
