//! Room-based WebSocket chat relay library.
//!
//! Clients set a username, join a named room and exchange chat messages and
//! typing signals with everyone currently in that room. The library owns the
//! connection/room registries, the broadcast fan-out, bounded per-room message
//! history and liveness probing; process bootstrap lives in the `server` binary.

pub mod common;
pub mod protocol;
pub mod server;
