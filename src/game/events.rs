//! Game Events
//!
//! Discrete occurrences produced while resolving a tick. They are turned
//! into wire messages by the broadcast emitter.

use crate::game::state::{FinalScore, PlayerId, SweetId};

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEventData {
    /// A player picked up a collectible
    SweetCollected {
        /// Collector
        player_id: PlayerId,
        /// Collectible taken
        sweet_id: SweetId,
    },

    /// The last collectible of the round was taken
    RoundOver {
        /// Every live player, best first
        scores: Vec<FinalScore>,
    },
}

/// A game event stamped with the tick that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u64,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u64, data: GameEventData) -> Self {
        Self { tick, data }
    }

    /// Create a collection event.
    pub fn sweet_collected(tick: u64, player_id: PlayerId, sweet_id: SweetId) -> Self {
        Self::new(tick, GameEventData::SweetCollected { player_id, sweet_id })
    }

    /// Create a round-over event.
    pub fn round_over(tick: u64, scores: Vec<FinalScore>) -> Self {
        Self::new(tick, GameEventData::RoundOver { scores })
    }
}
