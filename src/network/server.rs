//! WebSocket Game Server
//!
//! Accepts TCP connections, upgrades them to WebSocket and runs one reader
//! task plus one writer task per connection. Also spawns the hub
//! dispatcher, the tick loop and the two forwarders that relay emitter
//! output into the hub.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::engine::{Game, GameLoop};
use crate::network::emitter::{Broadcasts, Payload};
use crate::network::hub::{Hub, HubHandle, DEFAULT_HUB_CAPACITY};
use crate::network::protocol::ServerMessage;
use crate::network::session::ClientSession;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Outbound buffer per connection. A full buffer gets the connection evicted.
    pub session_buffer: usize,
    /// Inbound capacity of the hub dispatcher.
    pub hub_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            max_connections: 1000,
            session_buffer: 256,
            hub_capacity: DEFAULT_HUB_CAPACITY,
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connection limit reached.
    #[error("Connection limit reached")]
    ConnectionLimitReached,
}

/// Holds one connection slot until dropped.
struct ConnectionSlot {
    count: Arc<AtomicUsize>,
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Handle to the game shared by every connection.
    game: Game,
    /// Live connections.
    connections: Arc<AtomicUsize>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig, game: Game) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            game,
            connections: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        }
    }

    /// Bind the configured address and serve.
    pub async fn run(&self, game_loop: GameLoop, broadcasts: Broadcasts) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener, game_loop, broadcasts).await
    }

    /// Serve on an already bound listener until [`GameServer::shutdown`].
    #[instrument(skip_all)]
    pub async fn serve(
        &self,
        listener: TcpListener,
        game_loop: GameLoop,
        broadcasts: Broadcasts,
    ) -> Result<(), GameServerError> {
        info!("Game server listening on {}", listener.local_addr()?);

        let (hub, hub_handle) = Hub::new(self.config.hub_capacity);
        let hub_task = tokio::spawn(hub.run());
        let states_task = tokio::spawn(forward(broadcasts.states, hub_handle.clone()));
        let events_task = tokio::spawn(forward(broadcasts.events, hub_handle.clone()));
        let loop_task = tokio::spawn(game_loop.run());

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let slot = match self.acquire_slot() {
                                Ok(slot) => slot,
                                Err(e) => {
                                    warn!("Rejecting {}: {}", addr, e);
                                    continue;
                                }
                            };

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr, hub_handle.clone(), slot);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        loop_task.abort();
        states_task.abort();
        events_task.abort();
        hub_task.abort();

        Ok(())
    }

    fn acquire_slot(&self) -> Result<ConnectionSlot, GameServerError> {
        let previous = self.connections.fetch_add(1, Ordering::SeqCst);
        let slot = ConnectionSlot {
            count: self.connections.clone(),
        };
        if previous >= self.config.max_connections {
            return Err(GameServerError::ConnectionLimitReached);
        }
        Ok(slot)
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr, hub: HubHandle, slot: ConnectionSlot) {
        let session = ClientSession::new(self.game.clone());
        let buffer = self.config.session_buffer;
        let shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let _slot = slot;
            if let Err(e) = run_connection(stream, addr, session, hub, buffer, shutdown_rx).await {
                debug!("Connection {} ended with error: {}", addr, e);
            }
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Relay one emitter channel into the hub.
async fn forward(mut rx: mpsc::Receiver<Payload>, hub: HubHandle) {
    while let Some(payload) = rx.recv().await {
        if !hub.broadcast(payload).await {
            break;
        }
    }
}

/// Queue a direct reply on the connection's own buffer.
fn reply(tx: &mpsc::WeakSender<Payload>, msg: &ServerMessage) {
    let Some(tx) = tx.upgrade() else {
        return;
    };
    match msg.to_json() {
        Ok(json) => match tx.try_send(json.into()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => trace!("Reply buffer full, dropping reply"),
            Err(mpsc::error::TrySendError::Closed(_)) => trace!("Writer gone, dropping reply"),
        },
        Err(e) => error!("Failed to serialize reply: {}", e),
    }
}

async fn run_connection(
    stream: TcpStream,
    addr: SocketAddr,
    mut session: ClientSession,
    hub: HubHandle,
    buffer: usize,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), GameServerError> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let (out_tx, mut out_rx) = mpsc::channel::<Payload>(buffer.max(1));
    let replies = out_tx.downgrade();
    let Some(mut evicted) = hub.register(session.id(), out_tx).await else {
        debug!("Hub gone, dropping {}", addr);
        return Ok(());
    };
    session.mark_registered();

    let mut writer = tokio::spawn(async move {
        while let Some(payload) = out_rx.recv().await {
            if ws_sender.send(Message::Text(payload.to_string())).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    loop {
        tokio::select! {
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(msg) = session.handle_text(&text).await {
                            reply(&replies, &msg);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Client {} disconnected", addr);
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", addr, e);
                        break;
                    }
                    _ => {}
                }
            }
            _ = &mut writer => {
                debug!("Writer for {} finished", addr);
                break;
            }
            // The writer may be parked on a full socket and never finish
            _ = &mut evicted => {
                warn!("Client {} evicted", addr);
                break;
            }
            _ = shutdown_rx.recv() => {
                break;
            }
        }
    }

    // Cleanup
    writer.abort();
    session.close().await;
    hub.unregister(session.id()).await;

    info!("Client {} cleaned up", addr);
    Ok(())
}
