//! Grid Geometry
//!
//! Integer cells on a fixed rectangular board. Every coordinate that leaves
//! this module has been clamped to `[0, w-1] x [0, h-1]`.

use serde::{Deserialize, Serialize};

/// Board dimensions in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    /// Number of columns.
    pub w: i32,
    /// Number of rows.
    pub h: i32,
}

impl GridSize {
    /// Create a grid size. Callers validate that both sides are positive.
    pub const fn new(w: i32, h: i32) -> Self {
        Self { w, h }
    }

    /// Check whether a cell lies on the board.
    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.x < self.w && cell.y >= 0 && cell.y < self.h
    }

    /// Clamp arbitrary (possibly huge) coordinates onto the board.
    pub fn clamp(&self, x: i64, y: i64) -> Cell {
        Cell {
            x: x.clamp(0, (self.w - 1).max(0) as i64) as i32,
            y: y.clamp(0, (self.h - 1).max(0) as i64) as i32,
        }
    }

    /// Iterate every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> {
        let (w, h) = (self.w, self.h);
        (0..h).flat_map(move |y| (0..w).map(move |x| Cell { x, y }))
    }
}

/// A single board cell.
///
/// Ordered by `(x, y)` so occupancy maps iterate deterministically.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Cell {
    /// Create a cell.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Neighbouring cell one step in `dir`, clamped to the board.
    ///
    /// Stepping off an edge leaves the cell unchanged.
    pub fn step(self, dir: Direction, size: GridSize) -> Cell {
        let (dx, dy) = dir.delta();
        size.clamp(self.x as i64 + dx as i64, self.y as i64 + dy as i64)
    }
}

/// Single-cell movement direction. `up` decreases `y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// y - 1
    Up,
    /// y + 1
    Down,
    /// x - 1
    Left,
    /// x + 1
    Right,
}

impl Direction {
    /// Unit offset for this direction.
    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}
