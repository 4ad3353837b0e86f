//! Presence registry: which usernames are bound to open connections.

use std::collections::HashMap;

use tokio::sync::Mutex;
use uuid::Uuid;

use super::error::FrameError;

/// What presence knows about one bound username.
#[derive(Debug, Clone)]
pub struct PresenceEntry {
    pub conn: Uuid,
    /// Current room, if the user has joined one.
    pub room: Option<String>,
}

/// Maps usernames to open connections. A name is unique among currently-open
/// connections only: it frees up the instant its holder disconnects and is
/// not reserved across reconnects.
#[derive(Debug, Default)]
pub struct Presence {
    entries: Mutex<HashMap<String, PresenceEntry>>,
}

impl Presence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `conn`. Fails if another open connection holds the
    /// name. Rebinding the same connection to a new name releases its old
    /// name in the same step.
    pub async fn claim(&self, conn: Uuid, name: &str) -> Result<(), FrameError> {
        let mut entries = self.entries.lock().await;
        match entries.get(name) {
            Some(existing) if existing.conn != conn => Err(FrameError::UsernameTaken),
            Some(_) => Ok(()),
            None => {
                let room = entries
                    .values()
                    .find(|e| e.conn == conn)
                    .and_then(|e| e.room.clone());
                entries.retain(|_, e| e.conn != conn);
                entries.insert(name.to_string(), PresenceEntry { conn, room });
                Ok(())
            }
        }
    }

    /// Record `name`'s current room. No-op if the name is not bound.
    pub async fn set_room(&self, name: &str, room: &str) {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(name) {
            entry.room = Some(room.to_string());
        }
    }

    /// Drop whatever name `conn` holds, returning the released entry.
    /// Idempotent; called on every disconnect and eviction regardless of
    /// whether an identity was ever set.
    pub async fn release(&self, conn: Uuid) -> Option<(String, PresenceEntry)> {
        let mut entries = self.entries.lock().await;
        let name = entries
            .iter()
            .find(|(_, e)| e.conn == conn)
            .map(|(name, _)| name.clone())?;
        let entry = entries.remove(&name)?;
        Some((name, entry))
    }

    pub async fn is_bound(&self, name: &str) -> bool {
        self.entries.lock().await.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_claim_unique_name_succeeds() {
        // テスト項目: 未使用のユーザー名の登録が成功する
        // given (前提条件):
        let presence = Presence::new();
        let conn = Uuid::new_v4();

        // when (操作):
        let result = presence.claim(conn, "alice").await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert!(presence.is_bound("alice").await);
    }

    #[tokio::test]
    async fn test_claim_taken_name_fails_while_holder_is_open() {
        // テスト項目: 他の接続が保持中のユーザー名は登録できない
        // given (前提条件):
        let presence = Presence::new();
        let conn_a = Uuid::new_v4();
        let conn_b = Uuid::new_v4();
        presence.claim(conn_a, "alice").await.unwrap();

        // when (操作):
        let result = presence.claim(conn_b, "alice").await;

        // then (期待する結果):
        assert_eq!(result, Err(FrameError::UsernameTaken));
    }

    #[tokio::test]
    async fn test_released_name_can_be_claimed_by_another_connection() {
        // テスト項目: 切断で解放されたユーザー名は別の接続が取得できる
        // given (前提条件):
        let presence = Presence::new();
        let conn_a = Uuid::new_v4();
        let conn_b = Uuid::new_v4();
        presence.claim(conn_a, "alice").await.unwrap();

        // when (操作):
        presence.release(conn_a).await;
        let result = presence.claim(conn_b, "alice").await;

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        // テスト項目: release は何度呼んでも安全（identity 未設定でも）
        // given (前提条件):
        let presence = Presence::new();
        let conn = Uuid::new_v4();
        presence.claim(conn, "alice").await.unwrap();

        // when (操作):
        let first = presence.release(conn).await;
        let second = presence.release(conn).await;
        let unnamed = presence.release(Uuid::new_v4()).await;

        // then (期待する結果):
        assert_eq!(first.map(|(name, _)| name), Some("alice".to_string()));
        assert!(second.is_none());
        assert!(unnamed.is_none());
    }

    #[tokio::test]
    async fn test_rebind_releases_previous_name_and_keeps_room() {
        // テスト項目: 同一接続の再登録で旧ユーザー名が解放され room が引き継がれる
        // given (前提条件):
        let presence = Presence::new();
        let conn = Uuid::new_v4();
        presence.claim(conn, "alice").await.unwrap();
        presence.set_room("alice", "lobby").await;

        // when (操作):
        presence.claim(conn, "alice2").await.unwrap();

        // then (期待する結果):
        assert!(!presence.is_bound("alice").await);
        assert!(presence.is_bound("alice2").await);
        let (_, entry) = presence.release(conn).await.unwrap();
        assert_eq!(entry.room.as_deref(), Some("lobby"));
    }
}
