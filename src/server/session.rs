//! Per-connection session state.

/// Mutable state owned by one connection's receive task. Everything a client
/// is starts out unset: identity arrives with `setUsername`, room membership
/// with `joinRoom`.
#[derive(Debug, Default)]
pub struct Session {
    pub username: Option<String>,
    pub room: Option<String>,
    /// Last accepted typing broadcast, Unix millis. Used for throttling.
    pub last_typing_at: Option<i64>,
}

impl Session {
    /// Record a typing signal at `now_millis`. Returns `true` if a broadcast
    /// is allowed, `false` if the signal falls inside the throttle window.
    pub fn typing_allowed(&mut self, now_millis: i64, throttle_ms: i64) -> bool {
        if let Some(last) = self.last_typing_at
            && now_millis - last < throttle_ms
        {
            return false;
        }
        self.last_typing_at = Some(now_millis);
        true
    }
}
