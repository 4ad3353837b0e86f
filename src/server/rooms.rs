//! Room table: membership, bounded history and broadcast fan-out.
//!
//! Rooms live behind their own mutex so operations on the same room are
//! linearized (member set and history always update together) while traffic
//! in different rooms never contends. The outer table lock is only held long
//! enough to look a room up.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

use crate::protocol::{ChatMessage, ServerFrame};

use super::connection::Outbound;

/// One joined connection inside a room.
#[derive(Debug)]
pub struct Member {
    pub username: String,
    pub sender: mpsc::UnboundedSender<Outbound>,
}

/// A room's members plus its retained message history.
#[derive(Debug, Default)]
pub struct Room {
    members: HashMap<Uuid, Member>,
    history: VecDeque<ChatMessage>,
    /// Set when the teardown timer removed this room from the table. A join
    /// racing the timer may still hold the old `Arc`; the flag tells it to
    /// start over on a fresh room instead of populating an orphan.
    retired: bool,
}

impl Room {
    /// Usernames of current members, sorted for consistent ordering.
    fn user_list(&self) -> Vec<String> {
        let mut users: Vec<String> = self.members.values().map(|m| m.username.clone()).collect();
        users.sort();
        users
    }

    /// Deliver a frame to every member. Fire-and-forget: members whose send
    /// task is gone are skipped, and the liveness monitor owns their eviction.
    fn broadcast(&self, frame: &ServerFrame) {
        let json = frame.to_json();
        for (conn_id, member) in &self.members {
            if member.sender.send(Outbound::Frame(json.clone())).is_err() {
                tracing::warn!(
                    "Failed to queue frame for '{}' (connection {})",
                    member.username,
                    conn_id
                );
            }
        }
    }

    fn broadcast_users(&self, room_id: &str) {
        self.broadcast(&ServerFrame::RoomUsers {
            users: self.user_list(),
            user_count: self.members.len(),
            room: room_id.to_string(),
        });
    }
}

/// Registry of all rooms, keyed by room id (free-form, case-sensitive).
///
/// Lock order is always table → room; room critical sections never await, so
/// the table lock is never held across suspension points for long.
#[derive(Debug)]
pub struct RoomTable {
    /// Shared with teardown timer tasks, which outlive any one borrow.
    rooms: Arc<Mutex<HashMap<String, Arc<Mutex<Room>>>>>,
    history_limit: usize,
    grace: Duration,
}

impl RoomTable {
    pub fn new(history_limit: usize, grace: Duration) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            history_limit,
            grace,
        }
    }

    /// Add `conn_id` to `room_id`, creating the room (with fresh history) on
    /// first join. Acknowledges the join to the joining member, then
    /// broadcasts the updated member list to the whole room, in that order.
    pub async fn join(&self, room_id: &str, conn_id: Uuid, member: Member) {
        loop {
            let room_arc = {
                let mut rooms = self.rooms.lock().await;
                rooms
                    .entry(room_id.to_string())
                    .or_insert_with(|| {
                        tracing::info!("Created new room: {}", room_id);
                        Arc::new(Mutex::new(Room::default()))
                    })
                    .clone()
            };

            let mut room = room_arc.lock().await;
            if room.retired {
                // Lost the race against the teardown timer; the entry we got
                // is already out of the table. Re-look-up creates a new room.
                continue;
            }

            let ack = ServerFrame::JoinResponse {
                success: true,
                room: room_id.to_string(),
                message: None,
            };
            if member.sender.send(Outbound::Frame(ack.to_json())).is_err() {
                tracing::warn!("Failed to queue join ack for '{}'", member.username);
            }
            tracing::info!("User '{}' joined room: {}", member.username, room_id);

            room.members.insert(conn_id, member);
            room.broadcast_users(room_id);
            return;
        }
    }

    /// Remove `conn_id` from `room_id` (explicit join-elsewhere or
    /// disconnect). Remaining members get a membership broadcast; if the room
    /// emptied, its teardown is scheduled with history retained.
    pub async fn leave(&self, room_id: &str, conn_id: Uuid) {
        let Some(room_arc) = self.lookup(room_id).await else {
            return;
        };

        let mut room = room_arc.lock().await;
        if room.retired || room.members.remove(&conn_id).is_none() {
            return;
        }

        if room.members.is_empty() {
            tracing::info!("Room {} is empty, preserving history for reconnects", room_id);
            self.schedule_teardown(room_id.to_string());
        } else {
            room.broadcast_users(room_id);
        }
    }

    /// Replace the stored username for a member that re-ran `setUsername`
    /// while joined, so later membership broadcasts carry the current name.
    pub async fn rename_member(&self, room_id: &str, conn_id: Uuid, username: &str) {
        if let Some(room_arc) = self.lookup(room_id).await {
            let mut room = room_arc.lock().await;
            if let Some(member) = room.members.get_mut(&conn_id) {
                member.username = username.to_string();
            }
        }
    }

    /// Append a message to the room's history (evicting the oldest past the
    /// limit) and broadcast it to every member, sender included. History and
    /// member set update under one lock, so per-room broadcast order matches
    /// history order.
    pub async fn append_message(&self, room_id: &str, message: ChatMessage) -> bool {
        let Some(room_arc) = self.lookup(room_id).await else {
            return false;
        };

        let mut room = room_arc.lock().await;
        if room.retired {
            return false;
        }

        room.history.push_back(message.clone());
        while room.history.len() > self.history_limit {
            room.history.pop_front();
        }
        room.broadcast(&ServerFrame::Message(message));
        true
    }

    /// Broadcast an ephemeral frame (typing) to a room without touching
    /// history.
    pub async fn broadcast_ephemeral(&self, room_id: &str, frame: &ServerFrame) {
        if let Some(room_arc) = self.lookup(room_id).await {
            let room = room_arc.lock().await;
            if !room.retired {
                room.broadcast(frame);
            }
        }
    }

    /// Full retained history, oldest first. `None` if the room does not
    /// exist (never created, or destroyed after its grace period).
    pub async fn history(&self, room_id: &str) -> Option<Vec<ChatMessage>> {
        let room_arc = self.lookup(room_id).await?;
        let room = room_arc.lock().await;
        if room.retired {
            return None;
        }
        Some(room.history.iter().cloned().collect())
    }

    pub async fn member_count(&self, room_id: &str) -> usize {
        match self.lookup(room_id).await {
            Some(room_arc) => room_arc.lock().await.members.len(),
            None => 0,
        }
    }

    async fn lookup(&self, room_id: &str) -> Option<Arc<Mutex<Room>>> {
        let rooms = self.rooms.lock().await;
        rooms.get(room_id).cloned()
    }

    /// Destroy `room_id` after the grace period if it is still empty.
    /// Check-then-act: the timer is never cancelled; a join during the grace
    /// window simply makes the expiry a no-op. Membership is re-checked at
    /// fire time under both locks, so a racing join either lands before the
    /// check (timer no-ops) or sees `retired` and re-creates the room.
    fn schedule_teardown(&self, room_id: String) {
        let table_rooms = Arc::clone(&self.rooms);
        let grace = self.grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;

            let mut rooms = table_rooms.lock().await;
            let Some(room_arc) = rooms.get(&room_id).cloned() else {
                return;
            };
            let mut room = room_arc.lock().await;
            if room.members.is_empty() {
                tracing::info!("Deleting empty room: {}", room_id);
                room.retired = true;
                rooms.remove(&room_id);
            }
        });
    }
}
