//! Sweet Grid Server
//!
//! Process entry point: parses flags, sets up logging, builds the game and
//! serves it over WebSocket until Ctrl+C.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sweetgrid::{new_game, GameConfig, GameServer, ServerConfig, VERSION};

/// Authoritative server for the Sweet Grid game.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Address to listen on
    #[clap(short, long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,
    /// Board width in cells
    #[clap(long, default_value = "10")]
    width: i32,
    /// Board height in cells
    #[clap(long, default_value = "10")]
    height: i32,
    /// Collectibles per round
    #[clap(short, long, default_value = "20")]
    sweets: usize,
    /// Ticks per second
    #[clap(short, long, default_value = "10")]
    tick_rate: u32,
    /// Seconds to wait before restarting a finished round
    #[clap(long, default_value = "3")]
    restart_delay: u64,
    /// Stop the simulation after the first round instead of restarting
    #[clap(long)]
    no_restart: bool,
    /// Seed for collectible and spawn placement
    #[clap(long)]
    seed: Option<u64>,
    /// Maximum concurrent connections
    #[clap(long, default_value = "1000")]
    max_connections: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let game_config = GameConfig {
        width: args.width,
        height: args.height,
        sweet_count: args.sweets,
        tick_rate: args.tick_rate,
        restart_delay: (!args.no_restart).then(|| Duration::from_secs(args.restart_delay)),
        rng_seed: args.seed,
        ..Default::default()
    };
    let server_config = ServerConfig {
        bind_addr: args.addr,
        max_connections: args.max_connections,
        ..Default::default()
    };

    info!("Sweet Grid Server v{}", VERSION);
    info!(
        "Grid {}x{}, {} sweets, {} Hz",
        game_config.width, game_config.height, game_config.sweet_count, game_config.tick_rate
    );

    let (game, game_loop, broadcasts) = new_game(game_config).context("invalid game configuration")?;
    let server = Arc::new(GameServer::new(server_config, game));

    let running = server.clone();
    let server_handle = tokio::spawn(async move { running.run(game_loop, broadcasts).await });

    tokio::select! {
        result = server_handle => {
            result.context("server task panicked")??;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            server.shutdown();
        }
    }

    Ok(())
}
