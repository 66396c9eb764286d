//! Game Logic Module
//!
//! Board state and the rules that move it forward one tick at a time.
//!
//! ## Module Structure
//!
//! - `state`: Players, collectibles and the board they live on
//! - `world`: Lock-guarded store shared by sessions and the tick loop
//! - `input`: Movement commands and the bounded command queue
//! - `collision`: Cell occupancy during a tick
//! - `sweet`: Collectible spawning and pickup
//! - `tick`: Per-tick command resolution
//! - `events`: What happened during a tick

pub mod collision;
pub mod events;
pub mod input;
pub mod state;
pub mod sweet;
pub mod tick;
pub mod world;

// Re-export key types
pub use events::{GameEvent, GameEventData};
pub use input::{Command, CommandQueue, CommandSender, MoveAction};
pub use state::{FinalScore, Player, PlayerId, Sweet, SweetId, WorldError, WorldSnapshot, WorldState};
pub use tick::{resolve_tick, MovePlan, TickResult};
pub use world::World;
