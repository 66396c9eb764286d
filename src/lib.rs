//! # Sweet Grid Server
//!
//! Authoritative simulation core for a real-time multiplayer grid game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SWEET GRID SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Grid primitives                           │
//! │  ├── grid.rs     - Cells, board size, directions, clamping   │
//! │  └── rng.rs      - Seeded Xorshift128+ placement RNG         │
//! │                                                              │
//! │  game/           - Simulation (synchronous)                  │
//! │  ├── state.rs    - Players, collectibles, World Store data   │
//! │  ├── world.rs    - Lock-guarded World Store                  │
//! │  ├── input.rs    - Commands and the bounded command queue    │
//! │  ├── collision.rs- Occupancy map                             │
//! │  ├── sweet.rs    - Collectible spawning and pickup           │
//! │  ├── tick.rs     - Tick resolution                           │
//! │  └── events.rs   - Tick events                               │
//! │                                                              │
//! │  engine.rs       - Config, game handle, fixed-rate scheduler │
//! │                                                              │
//! │  network/        - Networking                                │
//! │  ├── protocol.rs - JSON message types                        │
//! │  ├── emitter.rs  - Snapshot and event broadcast channels     │
//! │  ├── hub.rs      - Session dispatcher and fan-out            │
//! │  ├── session.rs  - Per-connection state machine              │
//! │  └── server.rs   - WebSocket server                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//!
//! session → command queue → tick resolver → World Store → emitter → hub →
//! every session. Joins and leaves go straight to the World Store.
//!
//! ## Fairness
//!
//! When two players want the same cell in the same tick, the player whose
//! last command arrived first gets it.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod engine;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::grid::{Cell, Direction, GridSize};
pub use core::rng::DeterministicRng;
pub use engine::{new_game, EngineError, Game, GameConfig, GameLoop};
pub use game::state::{Player, PlayerId, Sweet, SweetId};
pub use network::{GameServer, ServerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
