//! Session Hub
//!
//! A single dispatcher task owns the set of live session buffers. Other
//! tasks talk to it only through [`HubHandle`]. Fan-out never waits on a
//! session: a session whose buffer is full is evicted on the spot, and its
//! eviction signal fires so the connection tears itself down.

use std::collections::BTreeMap;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::network::emitter::Payload;

/// Unique connection identifier.
pub type SessionId = Uuid;

/// Default inbound capacity of the dispatcher.
pub const DEFAULT_HUB_CAPACITY: usize = 256;

/// Requests handled by the dispatcher.
#[derive(Debug)]
pub enum HubCommand {
    /// Start delivering broadcasts to a session.
    Register {
        /// Session
        id: SessionId,
        /// Session's outbound buffer
        tx: mpsc::Sender<Payload>,
        /// Fired when the hub drops the session
        evict: oneshot::Sender<()>,
    },
    /// Stop delivering to a session.
    Unregister {
        /// Session
        id: SessionId,
    },
    /// Deliver a payload to every live session.
    Broadcast(Payload),
    /// Report the number of live sessions.
    Count(oneshot::Sender<usize>),
}

/// A registered session as seen by the dispatcher.
#[derive(Debug)]
struct SessionLink {
    tx: mpsc::Sender<Payload>,
    evict: oneshot::Sender<()>,
}

/// The dispatcher. Run it with [`Hub::run`].
#[derive(Debug)]
pub struct Hub {
    sessions: BTreeMap<SessionId, SessionLink>,
    rx: mpsc::Receiver<HubCommand>,
}

/// Cheap handle used by connections and forwarders.
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl Hub {
    /// Create a dispatcher and its handle.
    pub fn new(capacity: usize) -> (Hub, HubHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Hub {
                sessions: BTreeMap::new(),
                rx,
            },
            HubHandle { tx },
        )
    }

    /// Process requests until every handle is dropped.
    pub async fn run(mut self) {
        while let Some(cmd) = self.rx.recv().await {
            self.dispatch(cmd);
        }
        debug!("Hub stopped with {} sessions", self.sessions.len());
    }

    /// Apply one request.
    pub fn dispatch(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Register { id, tx, evict } => {
                self.sessions.insert(id, SessionLink { tx, evict });
                debug!("Session {} registered ({} live)", id, self.sessions.len());
            }
            HubCommand::Unregister { id } => {
                if self.sessions.remove(&id).is_some() {
                    debug!("Session {} unregistered ({} live)", id, self.sessions.len());
                }
            }
            HubCommand::Broadcast(payload) => self.fan_out(payload),
            HubCommand::Count(reply) => {
                let _ = reply.send(self.sessions.len());
            }
        }
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no session is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn fan_out(&mut self, payload: Payload) {
        let mut dropped = Vec::new();
        for (id, link) in &self.sessions {
            match link.tx.try_send(payload.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("Session {} too slow, evicting", id);
                    dropped.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    info!("Session {} gone, dropping", id);
                    dropped.push(*id);
                }
            }
        }

        for id in dropped {
            if let Some(link) = self.sessions.remove(&id) {
                // The writer may be stuck on a backpressured socket
                let _ = link.evict.send(());
            }
        }
    }
}

impl HubHandle {
    /// Register a session's outbound buffer.
    ///
    /// Returns the eviction signal, or `None` if the dispatcher is gone. The
    /// signal also resolves (with an error) once the session is unregistered.
    pub async fn register(
        &self,
        id: SessionId,
        tx: mpsc::Sender<Payload>,
    ) -> Option<oneshot::Receiver<()>> {
        let (evict, evicted) = oneshot::channel();
        self.tx
            .send(HubCommand::Register { id, tx, evict })
            .await
            .ok()
            .map(|_| evicted)
    }

    /// Unregister a session. Unknown ids are ignored.
    pub async fn unregister(&self, id: SessionId) -> bool {
        self.tx.send(HubCommand::Unregister { id }).await.is_ok()
    }

    /// Queue a payload for every live session.
    pub async fn broadcast(&self, payload: Payload) -> bool {
        self.tx.send(HubCommand::Broadcast(payload)).await.is_ok()
    }

    /// Number of live sessions, or 0 if the dispatcher is gone.
    pub async fn session_count(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(HubCommand::Count(reply)).await.is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
