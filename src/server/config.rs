//! Engine tunables.

use std::time::Duration;

/// Configuration for the relay engine. Production runs on `Default`; tests
/// shrink the timers.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum number of messages retained per room, oldest evicted first.
    pub history_limit: usize,
    /// How long an emptied room keeps its history before being destroyed.
    pub room_grace: Duration,
    /// Interval between liveness probe sweeps.
    pub ping_interval: Duration,
    /// Minimum gap between typing broadcasts from one connection.
    pub typing_throttle_ms: i64,
    /// Server-enforced cap on a message body, in bytes. Covers `data:` URI
    /// image payloads; the original protocol had no server-side cap at all.
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            room_grace: Duration::from_secs(10 * 60),
            ping_interval: Duration::from_secs(30),
            typing_throttle_ms: 1000,
            max_message_bytes: 1024 * 1024,
        }
    }
}
