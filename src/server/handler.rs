//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::{ClientFrame, ServerFrame};

use super::{
    connection::{ConnHandle, Outbound},
    dispatch::dispatch,
    session::Session,
    state::AppState,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    // Identity arrives later over the protocol; the connection itself is
    // known by an opaque id from accept to cleanup.
    let conn_id = Uuid::new_v4();
    ws.on_upgrade(move |socket| handle_socket(socket, state, conn_id))
}

pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>, conn_id: Uuid) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Outbound queue for this client: broadcasts, probes and evictions all
    // arrive here and the send task below drains them onto the socket.
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = ConnHandle::new(tx.clone());
    let conn = handle.clone();
    state.connections.register(conn_id, handle).await;
    tracing::info!("New client connected: {}", conn_id);

    // Receive task: decode inbound frames sequentially and dispatch them, so
    // one client's own messages are never reordered.
    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        let mut session = Session::default();
        while let Some(msg) = ws_receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error on {}: {}", conn_id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => {
                        if let Err(e) =
                            dispatch(&recv_state, conn_id, &mut session, &tx, frame).await
                        {
                            let reply = ServerFrame::Error {
                                message: e.to_string(),
                            };
                            let _ = tx.send(Outbound::Frame(reply.to_json()));
                        }
                    }
                    // Unparseable frames (including unknown `type` values)
                    // are dropped without a reply.
                    Err(e) => {
                        tracing::warn!("Dropping undecodable frame from {}: {}", conn_id, e)
                    }
                },
                Message::Pong(_) => {
                    conn.mark_alive();
                }
                Message::Ping(_) => {
                    // axum answers pings on its own.
                    tracing::debug!("Received ping from {}", conn_id);
                }
                Message::Close(_) => {
                    tracing::info!("Client {} requested close", conn_id);
                    break;
                }
                Message::Binary(_) => {}
            }
        }
    });

    // Send task: drain the outbound queue onto the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(out) = rx.recv().await {
            match out {
                Outbound::Frame(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Outbound::Ping => {
                    if ws_sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
                Outbound::Terminate => {
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // If any one of the tasks completes, abort the other.
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Single cleanup path for client close, transport error and liveness
    // eviction: deregister, free the username, leave the room.
    state.connections.deregister(&conn_id).await;
    match state.presence.release(conn_id).await {
        Some((username, entry)) => {
            tracing::info!("Client disconnected: {}", username);
            if let Some(room) = entry.room {
                state.rooms.leave(&room, conn_id).await;
            }
        }
        None => tracing::info!("Client disconnected: {} (no username set)", conn_id),
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
