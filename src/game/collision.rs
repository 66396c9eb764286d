//! Occupancy Tracking
//!
//! Cell-to-player map used by the tick resolver to reject moves into cells
//! held by someone else.

use std::collections::BTreeMap;

use crate::core::grid::Cell;
use crate::game::state::{Player, PlayerId};

/// Which player currently holds which cell.
#[derive(Clone, Debug, Default)]
pub struct OccupancyMap {
    cells: BTreeMap<Cell, PlayerId>,
}

impl OccupancyMap {
    /// Build from current player positions.
    pub fn from_players<'a>(players: impl IntoIterator<Item = &'a Player>) -> Self {
        let cells = players
            .into_iter()
            .map(|p| (p.cell(), p.id.clone()))
            .collect();
        Self { cells }
    }

    /// Occupant of a cell.
    pub fn occupant(&self, cell: Cell) -> Option<&PlayerId> {
        self.cells.get(&cell)
    }

    /// True if `cell` is held by a player other than `mover`.
    #[inline]
    pub fn is_blocked_for(&self, cell: Cell, mover: &PlayerId) -> bool {
        self.occupant(cell).is_some_and(|occ| occ != mover)
    }

    /// Record a move: free `from`, claim `to`.
    pub fn relocate(&mut self, mover: &PlayerId, from: Cell, to: Cell) {
        if self.cells.get(&from) == Some(mover) {
            self.cells.remove(&from);
        }
        self.cells.insert(to, mover.clone());
    }

    /// Number of occupied cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when nobody is on the board.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, x: i32, y: i32) -> Player {
        Player::new(PlayerId::new(id), id, Cell::new(x, y))
    }

    #[test]
    fn test_blocked_only_by_others() {
        let players = [player("p-1", 1, 1), player("p-2", 2, 1)];
        let map = OccupancyMap::from_players(players.iter());

        let p1 = PlayerId::new("p-1");
        assert!(map.is_blocked_for(Cell::new(2, 1), &p1));
        assert!(!map.is_blocked_for(Cell::new(1, 1), &p1));
        assert!(!map.is_blocked_for(Cell::new(0, 0), &p1));
    }

    #[test]
    fn test_relocate_frees_old_cell() {
        let players = [player("p-1", 0, 0)];
        let mut map = OccupancyMap::from_players(players.iter());
        let p1 = PlayerId::new("p-1");

        map.relocate(&p1, Cell::new(0, 0), Cell::new(1, 0));

        assert!(map.occupant(Cell::new(0, 0)).is_none());
        assert_eq!(map.occupant(Cell::new(1, 0)), Some(&p1));
        assert_eq!(map.len(), 1);
    }
}
