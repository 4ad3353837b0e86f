//! WebSocket chat relay server implementation.

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod liveness;
pub mod presence;
pub mod rooms;
pub mod runner;
pub mod session;
pub mod signal;
pub mod state;

pub use config::ServerConfig;
pub use error::FrameError;
pub use runner::{router, run_server};
pub use state::AppState;
