//! Core Primitives
//!
//! Grid geometry and deterministic randomness shared by the simulation.

pub mod grid;
pub mod rng;

pub use grid::{Cell, Direction, GridSize};
pub use rng::DeterministicRng;
