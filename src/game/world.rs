//! World Store
//!
//! Shared handle over the authoritative [`WorldState`]. Every read and write
//! takes the same exclusive lock, so accessors never see a half-resolved
//! tick. The tick loop uses [`World::lock`] to resolve a tick and copy the
//! board in a single critical section.

use tokio::sync::{Mutex, MutexGuard};

use crate::core::grid::{Cell, GridSize};
use crate::core::rng::DeterministicRng;
use crate::game::state::{Player, PlayerId, SweetId, WorldError, WorldSnapshot, WorldState};

/// Thread-safe World Store.
#[derive(Debug)]
pub struct World {
    size: GridSize,
    state: Mutex<WorldState>,
}

impl World {
    /// Create a store with `sweet_count` collectibles and no players.
    pub fn new(size: GridSize, sweet_count: usize, rng: DeterministicRng) -> Self {
        Self::from_state(WorldState::with_sweets(size, rng, sweet_count))
    }

    /// Wrap an existing state.
    pub fn from_state(state: WorldState) -> Self {
        Self {
            size: state.size,
            state: Mutex::new(state),
        }
    }

    /// Board size. Never changes, so no lock is taken.
    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Exclusive access for the tick loop.
    pub async fn lock(&self) -> MutexGuard<'_, WorldState> {
        self.state.lock().await
    }

    /// Admit a player on a random unoccupied cell.
    pub async fn add_player(&self, name: &str) -> Result<Player, WorldError> {
        self.state.lock().await.add_player(name)
    }

    /// Remove a player. No-op if absent.
    pub async fn remove_player(&self, id: &PlayerId) -> Option<Player> {
        self.state.lock().await.remove_player(id)
    }

    /// Copy of one player.
    pub async fn get_player(&self, id: &PlayerId) -> Option<Player> {
        self.state.lock().await.get_player(id)
    }

    /// Number of live players.
    pub async fn player_count(&self) -> usize {
        self.state.lock().await.players.len()
    }

    /// Number of collectibles left.
    pub async fn sweets_count(&self) -> usize {
        self.state.lock().await.sweets_count()
    }

    /// Place or replace a collectible.
    pub async fn set_sweet(&self, id: SweetId, cell: Cell) {
        self.state.lock().await.set_sweet(id, cell)
    }

    /// Remove every collectible.
    pub async fn clear_sweets(&self) {
        self.state.lock().await.clear_sweets()
    }

    /// Teleport a player (no collision check).
    pub async fn set_player_position(&self, id: &PlayerId, cell: Cell) -> bool {
        self.state.lock().await.set_player_position(id, cell)
    }

    /// Current tick number.
    pub async fn tick(&self) -> u64 {
        self.state.lock().await.tick
    }

    /// Detached copy of the board.
    pub async fn snapshot(&self) -> WorldSnapshot {
        self.state.lock().await.snapshot()
    }
}
