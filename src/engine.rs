//! Game Engine
//!
//! Wires the World Store, the command queue and the broadcast emitter
//! together and drives them at a fixed tick rate.
//!
//! [`new_game`] returns three pieces:
//! - [`Game`]: cloneable handle for connection code (join, leave, submit)
//! - [`GameLoop`]: the scheduler, owned by exactly one task
//! - [`Broadcasts`]: serialized snapshots and events for the forwarders

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, instrument};

use crate::core::grid::GridSize;
use crate::core::rng::DeterministicRng;
use crate::game::input::{Command, CommandQueue, CommandSender, DEFAULT_COMMAND_CAPACITY};
use crate::game::state::{Player, PlayerId, WorldError};
use crate::game::tick::{resolve_and_snapshot, MovePlan, TickResult};
use crate::game::world::World;
use crate::network::emitter::{BroadcastEmitter, Broadcasts, DEFAULT_BROADCAST_CAPACITY};

/// Engine errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Round and scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    /// Board width in cells.
    pub width: i32,
    /// Board height in cells.
    pub height: i32,
    /// Collectibles placed at the start of each round.
    pub sweet_count: usize,
    /// Ticks per second.
    pub tick_rate: u32,
    /// Pause before restarting after game over. `None` halts the scheduler.
    pub restart_delay: Option<Duration>,
    /// Command queue capacity.
    pub command_capacity: usize,
    /// Capacity of each broadcast channel.
    pub broadcast_capacity: usize,
    /// Fixed placement seed. Random when absent.
    pub rng_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
            sweet_count: 20,
            tick_rate: 10,
            restart_delay: Some(Duration::from_secs(3)),
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            rng_seed: None,
        }
    }
}

impl GameConfig {
    /// Check every field is in range.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.width < 1 || self.height < 1 {
            return Err(EngineError::InvalidConfig(format!(
                "grid must be at least 1x1, got {}x{}",
                self.width, self.height
            )));
        }
        if self.tick_period().is_zero() {
            return Err(EngineError::InvalidConfig(format!(
                "tick rate must be between 1 and 1000000000, got {}",
                self.tick_rate
            )));
        }
        if self.command_capacity == 0 || self.broadcast_capacity == 0 {
            return Err(EngineError::InvalidConfig("buffer capacities must be at least 1".into()));
        }
        Ok(())
    }

    /// Board size.
    pub fn grid(&self) -> GridSize {
        GridSize::new(self.width, self.height)
    }

    /// Time between ticks. Zero when the rate is zero or above 1 GHz.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(1)
            .checked_div(self.tick_rate)
            .unwrap_or(Duration::ZERO)
    }
}

/// Build a game from configuration.
pub fn new_game(config: GameConfig) -> Result<(Game, GameLoop, Broadcasts), EngineError> {
    config.validate()?;

    let rng = match config.rng_seed {
        Some(seed) => DeterministicRng::new(seed),
        None => DeterministicRng::from_entropy(),
    };
    let world = Arc::new(World::new(config.grid(), config.sweet_count, rng));
    let (commands, queue) = CommandQueue::bounded(config.command_capacity);
    let (emitter, broadcasts) = BroadcastEmitter::channel(config.broadcast_capacity);

    let game = Game {
        world: world.clone(),
        commands,
    };
    let game_loop = GameLoop {
        world,
        queue,
        emitter,
        config,
    };

    Ok((game, game_loop, broadcasts))
}

// =============================================================================
// GAME HANDLE
// =============================================================================

/// Handle given to the connection layer.
#[derive(Debug, Clone)]
pub struct Game {
    world: Arc<World>,
    commands: CommandSender,
}

impl Game {
    /// The shared World Store.
    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    /// Board size.
    pub fn grid(&self) -> GridSize {
        self.world.size()
    }

    /// Add a player on a random free cell.
    pub async fn join(&self, name: &str) -> Result<Player, WorldError> {
        self.world.add_player(name).await
    }

    /// Remove a player.
    pub async fn leave(&self, id: &PlayerId) -> Option<Player> {
        self.world.remove_player(id).await
    }

    /// Queue a move for the next tick. Never waits.
    pub fn submit(&self, command: Command) -> bool {
        self.commands.submit(command)
    }
}

// =============================================================================
// SCHEDULER
// =============================================================================

/// Fixed-rate tick scheduler.
#[derive(Debug)]
pub struct GameLoop {
    world: Arc<World>,
    queue: CommandQueue,
    emitter: BroadcastEmitter,
    config: GameConfig,
}

impl GameLoop {
    /// Resolve one tick and emit its events, then its snapshot.
    ///
    /// The lock covers resolution and the snapshot copy only.
    pub async fn step(&mut self) -> TickResult {
        let plan = MovePlan::from_commands(self.queue.drain());

        let (result, snapshot) = {
            let mut state = self.world.lock().await;
            resolve_and_snapshot(&mut state, &plan)
        };

        for event in &result.events {
            self.emitter.emit_event(event);
        }
        self.emitter.emit_snapshot(snapshot);

        result
    }

    /// Start a new round. Commands queued meanwhile are discarded.
    pub async fn restart_round(&mut self) {
        let discarded = self.queue.drain().len();
        self.world.lock().await.restart_round(self.config.sweet_count);
        info!("Round restarted ({} stale commands discarded)", discarded);
    }

    /// Tick until game over with restarts disabled. Otherwise runs forever.
    #[instrument(skip(self), fields(tick_rate = self.config.tick_rate))]
    pub async fn run(mut self) {
        let mut ticker = interval(self.config.tick_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let result = self.step().await;

            if !result.round_over {
                continue;
            }

            info!("Round over at tick {}", result.tick);
            match self.config.restart_delay {
                Some(delay) => {
                    debug!("Restarting in {:?}", delay);
                    sleep(delay).await;
                    self.restart_round().await;
                    ticker.reset();
                }
                None => {
                    info!("Restart disabled, stopping tick loop");
                    break;
                }
            }
        }
    }
}
