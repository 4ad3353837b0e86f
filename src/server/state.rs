//! Shared application state.

use std::sync::Arc;

use crate::common::time::Clock;

use super::{
    config::ServerConfig, connection::ConnectionRegistry, presence::Presence, rooms::RoomTable,
};

/// Everything the connection handlers and the liveness monitor share. Built
/// once at server start and injected through axum state; there is no ambient
/// global registry.
pub struct AppState {
    pub config: ServerConfig,
    /// Username → open-connection binding.
    pub presence: Presence,
    /// Room membership, history and broadcast fan-out.
    pub rooms: RoomTable,
    /// Every open connection, swept by the liveness monitor.
    pub connections: Arc<ConnectionRegistry>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(config: ServerConfig, clock: Arc<dyn Clock>) -> Self {
        let rooms = RoomTable::new(config.history_limit, config.room_grace);
        Self {
            config,
            presence: Presence::new(),
            rooms,
            connections: Arc::new(ConnectionRegistry::new()),
            clock,
        }
    }
}
