//! Protocol-level precondition errors.

use thiserror::Error;

/// A frame failed its preconditions. The `Display` string is the exact
/// message reported to the client in an `error` frame; validation failures
/// never terminate the connection and never mutate state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("Username cannot be empty")]
    EmptyUsername,
    #[error("Username already taken")]
    UsernameTaken,
    #[error("Please set a username first")]
    UsernameNotSet,
    #[error("Room name cannot be empty")]
    EmptyRoomName,
    #[error("Please join a room first")]
    RoomNotJoined,
    #[error("Invalid message format")]
    InvalidMessage,
    #[error("Message too large")]
    MessageTooLarge,
    #[error("Room not found")]
    RoomNotFound,
}
