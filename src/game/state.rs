//! World State
//!
//! Authoritative board contents: grid size, players, collectibles and the
//! tick counter. Plain data plus mutation rules; locking lives in
//! [`crate::game::world`].
//!
//! BTreeMap everywhere so snapshots and scans iterate in a stable order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::grid::{Cell, GridSize};
use crate::core::rng::DeterministicRng;
use crate::game::sweet::spawn_sweets;

/// Random picks tried before falling back to a full scan.
pub const RANDOM_PLACEMENT_ATTEMPTS: usize = 1000;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Stable player identity (`p-<n>`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier for the `seq`-th player ever admitted.
    pub fn from_seq(seq: u64) -> Self {
        Self(format!("p-{}", seq))
    }

    /// Borrow as str.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collectible identity (`s<n>`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SweetId(pub String);

impl SweetId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier for the `n`-th collectible of a round (1-based).
    pub fn from_index(n: usize) -> Self {
        Self(format!("s{}", n))
    }
}

impl fmt::Display for SweetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// ENTITIES
// =============================================================================

/// A player on the board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Unique player ID
    pub id: PlayerId,
    /// Display name chosen at join
    pub name: String,
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
    /// Collectibles picked up this round
    pub score: u32,
}

impl Player {
    /// Create a player with zero score.
    pub fn new(id: PlayerId, name: impl Into<String>, cell: Cell) -> Self {
        Self {
            id,
            name: name.into(),
            x: cell.x,
            y: cell.y,
            score: 0,
        }
    }

    /// Current cell.
    #[inline]
    pub fn cell(&self) -> Cell {
        Cell::new(self.x, self.y)
    }

    /// Move to a cell (no checks).
    #[inline]
    pub fn set_cell(&mut self, cell: Cell) {
        self.x = cell.x;
        self.y = cell.y;
    }
}

/// A collectible ("sweet").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sweet {
    /// Unique within the live set
    pub id: SweetId,
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl Sweet {
    /// Create a collectible at a cell.
    pub fn new(id: SweetId, cell: Cell) -> Self {
        Self {
            id,
            x: cell.x,
            y: cell.y,
        }
    }

    /// Cell this collectible sits on.
    #[inline]
    pub fn cell(&self) -> Cell {
        Cell::new(self.x, self.y)
    }
}

/// Final score line reported at game over.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalScore {
    /// Player identifier
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Score at the end of the round
    pub score: u32,
}

/// Point-in-time copy of the board, detached from the lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorldSnapshot {
    /// Tick that produced this snapshot
    pub tick: u64,
    /// Every live player
    pub players: Vec<Player>,
    /// Every live collectible
    pub sweets: Vec<Sweet>,
}

// =============================================================================
// ERRORS
// =============================================================================

/// World Store errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// No free cell after random probing and a full scan.
    #[error("no free cell left on the grid")]
    GridFull,
}

// =============================================================================
// WORLD STATE
// =============================================================================

/// Complete authoritative state of one round.
#[derive(Clone, Debug)]
pub struct WorldState {
    /// Fixed board size
    pub size: GridSize,
    /// Ticks resolved this round
    pub tick: u64,
    /// Live players keyed by id
    pub players: BTreeMap<PlayerId, Player>,
    /// Live collectibles keyed by id
    pub sweets: BTreeMap<SweetId, Sweet>,
    /// Placement randomness
    pub rng: DeterministicRng,
    /// Set once the last collectible of the round is gone
    pub round_over: bool,
    /// Sequence for the next player id; never reused
    next_player_seq: u64,
}

impl WorldState {
    /// Create an empty board (no players, no collectibles).
    pub fn new(size: GridSize, rng: DeterministicRng) -> Self {
        Self {
            size,
            tick: 0,
            players: BTreeMap::new(),
            sweets: BTreeMap::new(),
            rng,
            round_over: false,
            next_player_seq: 1,
        }
    }

    /// Create a board seeded with `sweet_count` collectibles.
    pub fn with_sweets(size: GridSize, rng: DeterministicRng, sweet_count: usize) -> Self {
        let mut state = Self::new(size, rng);
        spawn_sweets(&mut state, sweet_count);
        state
    }

    /// Player standing on a cell, if any.
    pub fn player_at(&self, cell: Cell) -> Option<&PlayerId> {
        self.players
            .values()
            .find(|p| p.cell() == cell)
            .map(|p| &p.id)
    }

    /// Whether any player occupies the cell.
    pub fn is_player_cell(&self, cell: Cell) -> bool {
        self.player_at(cell).is_some()
    }

    /// Whether any collectible sits on the cell.
    pub fn is_sweet_cell(&self, cell: Cell) -> bool {
        self.sweets.values().any(|s| s.cell() == cell)
    }

    /// Find a cell satisfying `is_free`: random picks first, then a
    /// row-major scan.
    pub fn find_free_cell(&mut self, is_free: impl Fn(&WorldState, Cell) -> bool) -> Option<Cell> {
        for _ in 0..RANDOM_PLACEMENT_ATTEMPTS {
            let cell = self.rng.random_cell(self.size);
            if is_free(&*self, cell) {
                return Some(cell);
            }
        }
        let state: &WorldState = self;
        state.size.cells().find(|cell| is_free(state, *cell))
    }

    /// Admit a new player on a random unoccupied cell.
    pub fn add_player(&mut self, name: &str) -> Result<Player, WorldError> {
        let cell = self
            .find_free_cell(|state, cell| !state.is_player_cell(cell))
            .ok_or(WorldError::GridFull)?;

        let id = PlayerId::from_seq(self.next_player_seq);
        self.next_player_seq += 1;

        let player = Player::new(id.clone(), name, cell);
        self.players.insert(id, player.clone());

        info!("Added player {} ({:?}) at ({}, {})", player.id, player.name, player.x, player.y);
        Ok(player)
    }

    /// Remove a player. No-op if absent.
    pub fn remove_player(&mut self, id: &PlayerId) -> Option<Player> {
        let removed = self.players.remove(id);
        if removed.is_some() {
            info!("Removed player {}", id);
        }
        removed
    }

    /// Copy of a player.
    pub fn get_player(&self, id: &PlayerId) -> Option<Player> {
        self.players.get(id).cloned()
    }

    /// Number of collectibles still on the board.
    pub fn sweets_count(&self) -> usize {
        self.sweets.len()
    }

    /// Place or replace a collectible (administrative hook).
    pub fn set_sweet(&mut self, id: SweetId, cell: Cell) {
        let cell = self.size.clamp(cell.x as i64, cell.y as i64);
        self.sweets.insert(id.clone(), Sweet::new(id, cell));
    }

    /// Remove every collectible (administrative hook).
    pub fn clear_sweets(&mut self) {
        self.sweets.clear();
    }

    /// Teleport a player, bypassing collision checks (administrative hook).
    ///
    /// Coordinates are still clamped to the board. Returns false if the
    /// player does not exist.
    pub fn set_player_position(&mut self, id: &PlayerId, cell: Cell) -> bool {
        let cell = self.size.clamp(cell.x as i64, cell.y as i64);
        match self.players.get_mut(id) {
            Some(player) => {
                player.set_cell(cell);
                true
            }
            None => false,
        }
    }

    /// Copy the board out.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            players: self.players.values().cloned().collect(),
            sweets: self.sweets.values().cloned().collect(),
        }
    }

    /// Scores of every live player, best first (ties by id).
    pub fn final_scores(&self) -> Vec<FinalScore> {
        let mut scores: Vec<FinalScore> = self
            .players
            .values()
            .map(|p| FinalScore {
                id: p.id.clone(),
                name: p.name.clone(),
                score: p.score,
            })
            .collect();

        scores.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        scores
    }

    /// Start a fresh round: scores and tick back to zero, new collectibles.
    pub fn restart_round(&mut self, sweet_count: usize) {
        for player in self.players.values_mut() {
            player.score = 0;
        }
        self.tick = 0;
        self.round_over = false;
        self.sweets.clear();
        spawn_sweets(self, sweet_count);

        debug!("Round restarted with {} sweets", self.sweets.len());
    }
}

// =============================================================================
// TESTS
// =============================================================================
