use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted chat message. Immutable once written; no edit or delete exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Surrogate row id. Internal to the store, never sent to clients.
    #[serde(skip_serializing, default)]
    pub id: i64,
    pub user: Option<String>,
    pub message: Option<String>,
    pub image: Option<String>,
    pub video: Option<String>,
    pub broadcast: Option<String>,
    pub file: Option<String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    /// Assigned by the store at insert; non-decreasing in insert order.
    pub timestamp: DateTime<Utc>,
}

/// Inbound message body. Every field is optional; the store rejects a payload
/// in which all content fields are empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub broadcast: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default, alias = "fileName")]
    pub file_name: Option<String>,
    #[serde(default, alias = "fileType")]
    pub file_type: Option<String>,
}

fn has_content(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.is_empty())
}

impl MessagePayload {
    /// Trim the text body, mapping a whitespace-only message to `None`.
    pub fn normalized(mut self) -> Self {
        self.message = self
            .message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from);
        self
    }

    /// True when none of the content fields carry anything. A bare file name
    /// or file type does not count as content.
    pub fn is_empty(&self) -> bool {
        !has_content(&self.message)
            && !has_content(&self.image)
            && !has_content(&self.video)
            && !has_content(&self.file)
            && !has_content(&self.broadcast)
    }
}

/// A message as broadcast to clients: the author plus the payload fields.
/// The internal row id and store timestamp are not part of the live event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub user: String,
    #[serde(flatten)]
    pub body: MessagePayload,
}

/// Per-event context, threaded explicitly into every hub handler.
#[derive(Debug, Clone)]
pub struct EventContext {
    pub connection_id: String,
    pub authenticated: bool,
    pub identity: Option<String>,
}

impl EventContext {
    pub fn new(connection_id: impl Into<String>, identity: Option<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            authenticated: identity.is_some(),
            identity,
        }
    }

    pub fn anonymous(connection_id: impl Into<String>) -> Self {
        Self::new(connection_id, None)
    }
}

/// Client-originated events, tagged by `type` on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Re-push the trailing history window to the requester.
    History,
    /// Submit a message for persistence and fan-out.
    Chat(MessagePayload),
    /// Search the trailing window by author or text.
    Search {
        #[serde(default)]
        query: String,
    },
    /// Presence keep-alive for the connection's identity.
    Heartbeat,
}

/// Server-originated events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    System { text: String },
    History { messages: Vec<ChatMessage> },
    Chat(OutgoingMessage),
    SearchResults { results: Vec<ChatMessage> },
    Users { users: Vec<String>, count: usize },
    Error { text: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_has_no_content() {
        assert!(MessagePayload::default().is_empty());
    }

    #[test]
    fn whitespace_message_normalizes_to_empty() {
        let payload = MessagePayload {
            message: Some("   \t ".into()),
            ..Default::default()
        }
        .normalized();
        assert!(payload.message.is_none());
        assert!(payload.is_empty());
    }

    #[test]
    fn any_media_field_counts_as_content() {
        for field in ["image", "video", "file", "broadcast"] {
            let mut payload = MessagePayload::default();
            match field {
                "image" => payload.image = Some("data:image/png;base64,...".into()),
                "video" => payload.video = Some("data:video/mp4;base64,...".into()),
                "file" => payload.file = Some("data:application/pdf;base64,...".into()),
                _ => payload.broadcast = Some("going live".into()),
            }
            assert!(!payload.is_empty(), "{field} should count as content");
        }
    }

    #[test]
    fn file_name_alone_is_not_content() {
        let payload = MessagePayload {
            file_name: Some("report.pdf".into()),
            file_type: Some("application/pdf".into()),
            ..Default::default()
        };
        assert!(payload.is_empty());
    }

    #[test]
    fn client_event_parses_tagged_json() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"chat","message":"hi","fileName":"a.txt"}"#).unwrap();
        match event {
            ClientEvent::Chat(payload) => {
                assert_eq!(payload.message.as_deref(), Some("hi"));
                assert_eq!(payload.file_name.as_deref(), Some("a.txt"));
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let event: ClientEvent = serde_json::from_str(r#"{"type":"heartbeat"}"#).unwrap();
        assert!(matches!(event, ClientEvent::Heartbeat));

        let event: ClientEvent = serde_json::from_str(r#"{"type":"search"}"#).unwrap();
        match event {
            ClientEvent::Search { query } => assert_eq!(query, ""),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn chat_broadcast_flattens_payload() {
        let event = ServerEvent::Chat(OutgoingMessage {
            user: "ana".into(),
            body: MessagePayload {
                message: Some("hello".into()),
                ..Default::default()
            },
        });
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "chat");
        assert_eq!(json["user"], "ana");
        assert_eq!(json["message"], "hello");
    }

    #[test]
    fn history_omits_internal_row_id() {
        let event = ServerEvent::History {
            messages: vec![ChatMessage {
                id: 42,
                user: Some("ana".into()),
                message: Some("hello".into()),
                image: None,
                video: None,
                broadcast: None,
                file: None,
                file_name: None,
                file_type: None,
                timestamp: Utc::now(),
            }],
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert!(json["messages"][0].get("id").is_none());
        assert_eq!(json["messages"][0]["user"], "ana");
    }
}
