//! Liveness monitor: periodic ping sweep over every open connection.
//!
//! Two-state machine per connection: `alive` is cleared when a probe goes
//! out and set again by the peer's pong. A connection still un-cleared at
//! the next sweep missed a full cycle and is forcibly terminated, which runs
//! the same cleanup path as a client-initiated close.

use std::sync::{Arc, atomic::Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;

use super::connection::{ConnectionRegistry, Outbound};

/// Spawn the background sweep loop. Aborted when the server shuts down.
pub fn spawn_monitor(registry: Arc<ConnectionRegistry>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; connections get a full
        // interval before their first probe.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep(&registry).await;
        }
    })
}

/// One probe pass: evict connections that never answered the previous probe,
/// ping the rest.
pub async fn sweep(registry: &ConnectionRegistry) {
    for (conn_id, handle) in registry.snapshot().await {
        if !handle.alive.swap(false, Ordering::Relaxed) {
            tracing::warn!("Connection {} terminated (unresponsive)", conn_id);
            let _ = handle.sender.send(Outbound::Terminate);
        } else if handle.sender.send(Outbound::Ping).is_err() {
            // Send task already gone; its cleanup path deregisters the
            // connection.
            tracing::debug!("Connection {} closed before probe", conn_id);
        }
    }
}
