//! Collectible Spawning and Pickup
//!
//! Collectibles never share a cell with each other or with a player at the
//! moment they are placed.

use tracing::warn;

use crate::core::grid::Cell;
use crate::game::events::GameEvent;
use crate::game::state::{PlayerId, Sweet, SweetId, WorldState};

/// Place `count` collectibles (`s1`..`sN`) on random free cells.
///
/// Stops early if the board has no free cell left. Returns how many were
/// placed.
pub fn spawn_sweets(state: &mut WorldState, count: usize) -> usize {
    let mut placed = 0;

    for n in 1..=count {
        let cell = state.find_free_cell(|s, cell| !s.is_player_cell(cell) && !s.is_sweet_cell(cell));
        let Some(cell) = cell else {
            warn!("Grid saturated: placed {} of {} sweets", placed, count);
            break;
        };

        let id = SweetId::from_index(n);
        state.sweets.insert(id.clone(), Sweet::new(id, cell));
        placed += 1;
    }

    placed
}

/// Collectible sitting on a cell (first match).
pub fn sweet_at(state: &WorldState, cell: Cell) -> Option<SweetId> {
    state
        .sweets
        .values()
        .find(|s| s.cell() == cell)
        .map(|s| s.id.clone())
}

/// Pick up the collectible under a player, if any.
///
/// At most one collectible is taken. Returns the collection event.
pub fn collect_sweet(state: &mut WorldState, player_id: &PlayerId) -> Option<GameEvent> {
    let cell = state.players.get(player_id)?.cell();
    let sweet_id = sweet_at(state, cell)?;

    state.sweets.remove(&sweet_id)?;
    let player = state.players.get_mut(player_id)?;
    player.score = player.score.saturating_add(1);

    Some(GameEvent::sweet_collected(state.tick, player_id.clone(), sweet_id))
}
