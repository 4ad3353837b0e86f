//! Wire protocol for the chat relay.
//!
//! Every frame is a UTF-8 JSON object carrying a `type` discriminator plus
//! kind-specific fields. Inbound frames that fail to decode (malformed JSON,
//! unknown `type`, wrong field types) are dropped by the caller; decoding is
//! best-effort and never terminates a connection.

use serde::{Deserialize, Serialize};

/// Kind of a chat message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    Gif,
}

/// One retained chat message. Immutable once created; stored in room history
/// and relayed verbatim on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub username: String,
    pub message: String,
    pub message_type: MessageKind,
    /// RFC 3339 timestamp, assigned by the server at creation.
    pub timestamp: String,
}

/// Frames sent by clients.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientFrame {
    SetUsername {
        username: String,
    },
    JoinRoom {
        room: String,
    },
    #[serde(rename_all = "camelCase")]
    Message {
        message: String,
        /// Defaults to `text` when the field is absent.
        #[serde(default)]
        message_type: MessageKind,
    },
    Typing,
    GetRoomHistory {
        /// Defaults to the sender's current room.
        #[serde(default)]
        room: Option<String>,
    },
}

/// Frames sent by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerFrame {
    Error {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    JoinResponse {
        success: bool,
        room: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Message(ChatMessage),
    Typing {
        username: String,
        timestamp: String,
    },
    #[serde(rename_all = "camelCase")]
    RoomUsers {
        users: Vec<String>,
        user_count: usize,
        room: String,
    },
    RoomHistory {
        messages: Vec<ChatMessage>,
    },
}

impl ServerFrame {
    /// Serialize to the JSON wire form. Serialization of our own frame types
    /// cannot fail.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_set_username_frame() {
        // テスト項目: setUsername フレームが正しくデコードされる
        // given (前提条件):
        let json = r#"{"type":"setUsername","username":"alice"}"#;

        // when (操作):
        let frame: ClientFrame = serde_json::from_str(json).unwrap();

        // then (期待する結果):
        match frame {
            ClientFrame::SetUsername { username } => assert_eq!(username, "alice"),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_decode_message_frame_with_explicit_kind() {
        // テスト項目: messageType 付きの message フレームが正しくデコードされる
        // given (前提条件):
        let json = r#"{"type":"message","message":"data:image/png;base64,xyz","messageType":"image"}"#;

        // when (操作):
        let frame: ClientFrame = serde_json::from_str(json).unwrap();

        // then (期待する結果):
        match frame {
            ClientFrame::Message {
                message,
                message_type,
            } => {
                assert_eq!(message, "data:image/png;base64,xyz");
                assert_eq!(message_type, MessageKind::Image);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_decode_message_frame_defaults_to_text() {
        // テスト項目: messageType が省略された場合 text にデフォルトされる
        // given (前提条件):
        let json = r#"{"type":"message","message":"hi"}"#;

        // when (操作):
        let frame: ClientFrame = serde_json::from_str(json).unwrap();

        // then (期待する結果):
        match frame {
            ClientFrame::Message { message_type, .. } => {
                assert_eq!(message_type, MessageKind::Text)
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_decode_get_room_history_without_room() {
        // テスト項目: room 省略時の getRoomHistory が None としてデコードされる
        // given (前提条件):
        let json = r#"{"type":"getRoomHistory"}"#;

        // when (操作):
        let frame: ClientFrame = serde_json::from_str(json).unwrap();

        // then (期待する結果):
        match frame {
            ClientFrame::GetRoomHistory { room } => assert!(room.is_none()),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_decode_unknown_type_fails() {
        // テスト項目: 未知の type を持つフレームはデコードエラーになる
        // given (前提条件):
        let json = r#"{"type":"launchMissiles"}"#;

        // when (操作):
        let result = serde_json::from_str::<ClientFrame>(json);

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_encode_room_users_frame_field_names() {
        // テスト項目: roomUsers フレームが camelCase のフィールド名で出力される
        // given (前提条件):
        let frame = ServerFrame::RoomUsers {
            users: vec!["alice".to_string(), "bob".to_string()],
            user_count: 2,
            room: "lobby".to_string(),
        };

        // when (操作):
        let value: serde_json::Value = serde_json::from_str(&frame.to_json()).unwrap();

        // then (期待する結果):
        assert_eq!(value["type"], "roomUsers");
        assert_eq!(value["userCount"], 2);
        assert_eq!(value["users"][0], "alice");
        assert_eq!(value["room"], "lobby");
    }

    #[test]
    fn test_encode_message_frame_is_flat() {
        // テスト項目: message フレームがタグとフィールドをフラットに持つ
        // given (前提条件):
        let frame = ServerFrame::Message(ChatMessage {
            id: "id-1".to_string(),
            username: "alice".to_string(),
            message: "hi".to_string(),
            message_type: MessageKind::Text,
            timestamp: "2025-01-01T00:00:00+00:00".to_string(),
        });

        // when (操作):
        let value: serde_json::Value = serde_json::from_str(&frame.to_json()).unwrap();

        // then (期待する結果):
        assert_eq!(value["type"], "message");
        assert_eq!(value["username"], "alice");
        assert_eq!(value["messageType"], "text");
        assert_eq!(value["timestamp"], "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_encode_join_response_omits_empty_message() {
        // テスト項目: message が None の joinResponse に message フィールドが含まれない
        // given (前提条件):
        let frame = ServerFrame::JoinResponse {
            success: true,
            room: "lobby".to_string(),
            message: None,
        };

        // when (操作):
        let value: serde_json::Value = serde_json::from_str(&frame.to_json()).unwrap();

        // then (期待する結果):
        assert_eq!(value["type"], "joinResponse");
        assert_eq!(value["success"], true);
        assert!(value.get("message").is_none());
    }
}
