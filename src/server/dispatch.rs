//! Protocol dispatcher: validates one decoded frame and routes it.
//!
//! Every frame runs against exactly one handler. Precondition failures are
//! returned to the caller, which reports them to the originating connection
//! as an `error` frame; nothing here ever terminates a connection or mutates
//! state on a failed validation.

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::common::time::timestamp_to_rfc3339;
use crate::protocol::{ChatMessage, ClientFrame, MessageKind, ServerFrame};

use super::connection::Outbound;
use super::error::FrameError;
use super::rooms::Member;
use super::session::Session;
use super::state::AppState;

pub async fn dispatch(
    state: &AppState,
    conn_id: Uuid,
    session: &mut Session,
    sender: &mpsc::UnboundedSender<Outbound>,
    frame: ClientFrame,
) -> Result<(), FrameError> {
    match frame {
        ClientFrame::SetUsername { username } => {
            set_username(state, conn_id, session, &username).await
        }
        ClientFrame::JoinRoom { room } => join_room(state, conn_id, session, sender, &room).await,
        ClientFrame::Message {
            message,
            message_type,
        } => send_message(state, session, message, message_type).await,
        ClientFrame::Typing => {
            typing(state, session).await;
            Ok(())
        }
        ClientFrame::GetRoomHistory { room } => {
            get_room_history(state, session, sender, room).await
        }
    }
}

async fn set_username(
    state: &AppState,
    conn_id: Uuid,
    session: &mut Session,
    username: &str,
) -> Result<(), FrameError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(FrameError::EmptyUsername);
    }

    state.presence.claim(conn_id, username).await?;

    // Renaming while joined: keep the member record current so the next
    // membership broadcast carries the new name.
    if let Some(room) = &session.room {
        state.rooms.rename_member(room, conn_id, username).await;
    }

    session.username = Some(username.to_string());
    tracing::info!("User set username: {}", username);
    Ok(())
}

async fn join_room(
    state: &AppState,
    conn_id: Uuid,
    session: &mut Session,
    sender: &mpsc::UnboundedSender<Outbound>,
    room: &str,
) -> Result<(), FrameError> {
    let username = session
        .username
        .clone()
        .ok_or(FrameError::UsernameNotSet)?;
    let room_id = room.trim();
    if room_id.is_empty() {
        return Err(FrameError::EmptyRoomName);
    }

    // Membership is exclusive per connection: joining silently leaves the
    // prior room through the normal removal path.
    if let Some(prev) = session.room.take() {
        state.rooms.leave(&prev, conn_id).await;
    }

    state
        .rooms
        .join(
            room_id,
            conn_id,
            Member {
                username: username.clone(),
                sender: sender.clone(),
            },
        )
        .await;
    session.room = Some(room_id.to_string());
    state.presence.set_room(&username, room_id).await;
    Ok(())
}

async fn send_message(
    state: &AppState,
    session: &Session,
    message: String,
    message_type: MessageKind,
) -> Result<(), FrameError> {
    let username = session
        .username
        .clone()
        .ok_or(FrameError::UsernameNotSet)?;
    let room = session.room.clone().ok_or(FrameError::RoomNotJoined)?;

    if message.is_empty() {
        return Err(FrameError::InvalidMessage);
    }
    if message.len() > state.config.max_message_bytes {
        return Err(FrameError::MessageTooLarge);
    }
    match message_type {
        MessageKind::Text => {}
        MessageKind::Image => {
            if !message.starts_with("data:") {
                return Err(FrameError::InvalidMessage);
            }
        }
        // The stock client sends Giphy URLs, older ones inline data URIs.
        MessageKind::Gif => {
            if !(message.starts_with("data:")
                || message.starts_with("http://")
                || message.starts_with("https://"))
            {
                return Err(FrameError::InvalidMessage);
            }
        }
    }

    let record = ChatMessage {
        id: Uuid::new_v4().to_string(),
        username,
        message,
        message_type,
        timestamp: timestamp_to_rfc3339(state.clock.now_utc_millis()),
    };

    if !state.rooms.append_message(&room, record).await {
        // Only reachable if the room vanished under a live member, which the
        // teardown membership check rules out. Log and move on.
        tracing::warn!("Dropped message for missing room: {}", room);
    }
    Ok(())
}

/// Typing is best-effort and silent: unset identity/room or a throttled
/// signal produce no reply at all.
async fn typing(state: &AppState, session: &mut Session) {
    let (Some(username), Some(room)) = (session.username.clone(), session.room.clone()) else {
        return;
    };

    let now = state.clock.now_utc_millis();
    if !session.typing_allowed(now, state.config.typing_throttle_ms) {
        return;
    }

    state
        .rooms
        .broadcast_ephemeral(
            &room,
            &ServerFrame::Typing {
                username,
                timestamp: timestamp_to_rfc3339(now),
            },
        )
        .await;
}

async fn get_room_history(
    state: &AppState,
    session: &Session,
    sender: &mpsc::UnboundedSender<Outbound>,
    room: Option<String>,
) -> Result<(), FrameError> {
    if session.username.is_none() {
        return Err(FrameError::UsernameNotSet);
    }

    let target = room
        .or_else(|| session.room.clone())
        .ok_or(FrameError::RoomNotFound)?;
    let messages = state
        .rooms
        .history(&target)
        .await
        .ok_or(FrameError::RoomNotFound)?;

    let frame = ServerFrame::RoomHistory { messages };
    let _ = sender.send(Outbound::Frame(frame.to_json()));
    Ok(())
}
