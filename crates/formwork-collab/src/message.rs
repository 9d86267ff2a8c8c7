//! Realtime wire messages
//!
//! Every message is a JSON object tagged by `"type"`:
//!
//! ```json
//! {"type": "presence", "userId": "u1", "userName": "Ada", "status": "active", "timestamp": "..."}
//! {"type": "cursor", "userId": "u1", "cursor": {"x": 10.0, "y": 4.5}, "timestamp": "..."}
//! {"type": "leave", "userId": "u1", "timestamp": "..."}
//! {"type": "custom", "event": "comment.added", "payload": {...}}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    #[default]
    Active,
    Idle,
    Away,
}

/// Pointer position, optionally anchored to a schema node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPosition {
    pub x: f64,
    pub y: f64,
    /// `id` or `data-obj-id` of the node under the cursor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_key: Option<String>,
}

impl CursorPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            node_key: None,
        }
    }

    pub fn on_node(mut self, key: impl Into<String>) -> Self {
        self.node_key = Some(key.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RealtimeMessage {
    #[serde(rename_all = "camelCase")]
    Presence {
        user_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        avatar: Option<String>,
        #[serde(default)]
        status: PresenceStatus,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Cursor {
        user_id: String,
        cursor: CursorPosition,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Leave {
        user_id: String,
        timestamp: DateTime<Utc>,
    },
    /// Application-defined event, passed through untouched
    #[serde(rename_all = "camelCase")]
    Custom {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
        event: String,
        #[serde(default)]
        payload: Value,
    },
}

impl RealtimeMessage {
    /// Sender of the message, when it has one
    pub fn user_id(&self) -> Option<&str> {
        match self {
            RealtimeMessage::Presence { user_id, .. }
            | RealtimeMessage::Cursor { user_id, .. }
            | RealtimeMessage::Leave { user_id, .. } => Some(user_id),
            RealtimeMessage::Custom { user_id, .. } => user_id.as_deref(),
        }
    }

    pub fn custom(event: impl Into<String>, payload: Value) -> Self {
        RealtimeMessage::Custom {
            user_id: None,
            event: event.into(),
            payload,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let timestamp = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let msg = RealtimeMessage::Cursor {
            user_id: "u1".into(),
            cursor: CursorPosition::new(1.5, 2.0).on_node("grid-1"),
            timestamp,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "cursor",
                "userId": "u1",
                "cursor": {"x": 1.5, "y": 2.0, "nodeKey": "grid-1"},
                "timestamp": "2024-05-01T12:00:00Z"
            })
        );
    }

    #[test]
    fn test_parse_presence_with_defaults() {
        let msg = RealtimeMessage::from_json(
            r#"{"type":"presence","userId":"u2","timestamp":"2024-05-01T12:00:00Z"}"#,
        )
        .unwrap();
        match msg {
            RealtimeMessage::Presence {
                user_id,
                user_name,
                avatar,
                status,
                ..
            } => {
                assert_eq!(user_id, "u2");
                assert_eq!(user_name, None);
                assert_eq!(avatar, None);
                assert_eq!(status, PresenceStatus::Active);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_custom_and_unknown() {
        let msg = RealtimeMessage::from_json(r#"{"type":"custom","event":"ping"}"#).unwrap();
        assert_eq!(msg, RealtimeMessage::custom("ping", Value::Null));
        assert_eq!(msg.user_id(), None);

        assert!(RealtimeMessage::from_json(r#"{"type":"teleport"}"#).is_err());
    }
}
