//! Connection handles and the registry of open connections.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

/// Commands consumed by a connection's send task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A serialized frame to deliver as a text message.
    Frame(String),
    /// Transport-level liveness probe.
    Ping,
    /// Forced close (liveness eviction). The send task emits a Close frame
    /// and exits, which drives the same cleanup path as a client close.
    Terminate,
}

/// Handle to one open connection: its outbound queue and liveness flag.
///
/// Sends are fire-and-forget over an unbounded channel so a stalled peer
/// never blocks the operation issuing a broadcast; a peer that stops draining
/// its socket stops answering pings and is evicted by the liveness monitor.
#[derive(Debug, Clone)]
pub struct ConnHandle {
    pub sender: mpsc::UnboundedSender<Outbound>,
    /// Cleared by each probe sweep, set again by the peer's pong.
    pub alive: Arc<AtomicBool>,
}

impl ConnHandle {
    pub fn new(sender: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            sender,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Record a pong from the peer.
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Relaxed);
    }
}

/// Registry of every open connection, keyed by connection id. Shared with the
/// liveness monitor, which sweeps it on a fixed interval.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    inner: Mutex<HashMap<Uuid, ConnHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, conn_id: Uuid, handle: ConnHandle) {
        let mut conns = self.inner.lock().await;
        conns.insert(conn_id, handle);
        tracing::debug!("Connection {} registered ({} open)", conn_id, conns.len());
    }

    pub async fn deregister(&self, conn_id: &Uuid) {
        let mut conns = self.inner.lock().await;
        conns.remove(conn_id);
        tracing::debug!("Connection {} deregistered ({} open)", conn_id, conns.len());
    }

    /// Snapshot of all open handles, so the probe sweep never holds the lock
    /// while touching individual connections.
    pub async fn snapshot(&self) -> Vec<(Uuid, ConnHandle)> {
        let conns = self.inner.lock().await;
        conns.iter().map(|(id, h)| (*id, h.clone())).collect()
    }
}
