//! Movement Commands and the Command Queue
//!
//! Sessions submit intents from any task; the tick resolver drains them
//! once per tick. Submission never blocks: when the buffer is full the
//! intent is dropped and the player simply repeats it next frame.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::trace;

use crate::core::grid::{Cell, Direction, GridSize};
use crate::game::state::PlayerId;

/// Default command buffer capacity.
pub const DEFAULT_COMMAND_CAPACITY: usize = 1024;

// =============================================================================
// COMMAND TYPES
// =============================================================================

/// What a player asked to do this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveAction {
    /// One cell in a direction
    Step(Direction),
    /// Absolute target, clamped to the board
    Goto {
        /// Target column
        x: i64,
        /// Target row
        y: i64,
    },
}

impl MoveAction {
    /// Destination cell starting from `from`.
    pub fn destination(&self, from: Cell, size: GridSize) -> Cell {
        match *self {
            MoveAction::Step(dir) => from.step(dir, size),
            MoveAction::Goto { x, y } => size.clamp(x, y),
        }
    }
}

/// A movement intent from one player.
///
/// Arrival order is implicit: the position at which it leaves the queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    /// Who issued it
    pub player_id: PlayerId,
    /// What they want
    pub action: MoveAction,
}

impl Command {
    /// Directional move.
    pub fn step(player_id: PlayerId, dir: Direction) -> Self {
        Self {
            player_id,
            action: MoveAction::Step(dir),
        }
    }

    /// Absolute move.
    pub fn goto(player_id: PlayerId, x: i64, y: i64) -> Self {
        Self {
            player_id,
            action: MoveAction::Goto { x, y },
        }
    }
}

// =============================================================================
// COMMAND QUEUE
// =============================================================================

/// Producer side of the command queue. Cheap to clone.
#[derive(Clone, Debug)]
pub struct CommandSender {
    tx: mpsc::Sender<Command>,
}

impl CommandSender {
    /// Enqueue without waiting. Returns false if the command was dropped.
    pub fn submit(&self, command: Command) -> bool {
        match self.tx.try_send(command) {
            Ok(()) => true,
            Err(TrySendError::Full(command)) => {
                trace!("Command queue full, dropped move from {}", command.player_id);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Consumer side of the command queue, owned by the tick loop.
#[derive(Debug)]
pub struct CommandQueue {
    rx: mpsc::Receiver<Command>,
}

impl CommandQueue {
    /// Create a bounded queue and its producer handle.
    pub fn bounded(capacity: usize) -> (CommandSender, CommandQueue) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (CommandSender { tx }, CommandQueue { rx })
    }

    /// Take everything queued right now, in arrival order.
    ///
    /// Never waits for more commands.
    pub fn drain(&mut self) -> Vec<Command> {
        let mut commands = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(command) => commands.push(command),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        commands
    }
}
