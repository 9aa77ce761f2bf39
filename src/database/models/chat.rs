use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use uuid::Uuid;

/// Maximum title length derived from the first message of a chat
pub const TITLE_MAX_CHARS: usize = 100;

/// Row in the `chats` table. The UI reads `payload` verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatRecord {
    pub id: String,
    pub user_id: Uuid,
    pub payload: Value,
    pub is_newsletter: bool,
    pub cadence: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(rename = "messageIndex", default, skip_serializing_if = "Option::is_none")]
    pub message_index: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into(), message_index: None }
    }

    pub fn assistant(content: impl Into<String>, index: usize) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            message_index: Some(index.to_string()),
        }
    }
}

impl ChatRecord {
    /// Build a chat from prior messages plus a new assistant completion.
    /// The completion's `messageIndex` is the number of prior messages.
    pub fn with_completion(
        id: impl Into<String>,
        user_id: Uuid,
        mut messages: Vec<ChatMessage>,
        completion: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let id = id.into();
        let title = messages.first().map(|m| title_from(&m.content)).unwrap_or_default();
        let index = messages.len();
        messages.push(ChatMessage::assistant(completion, index));

        let payload = json!({
            "id": id,
            "title": title,
            "userId": user_id,
            "createdAt": created_at.to_rfc3339(),
            "path": format!("/chat/{}", id),
            "messages": messages,
        });

        Self { id, user_id, payload, is_newsletter: false, cadence: None }
    }

    pub fn newsletter(mut self, cadence: Option<String>) -> Self {
        self.is_newsletter = true;
        self.cadence = cadence;
        self
    }

    /// True when the payload has the shape the history list can render
    pub fn is_renderable(&self) -> bool {
        let p = &self.payload;
        p.get("id").is_some()
            && p.get("path").is_some()
            && p.get("title").is_some()
            && p.get("messages").map(Value::is_array).unwrap_or(false)
    }
}

/// First `TITLE_MAX_CHARS` characters, never splitting a code point
pub fn title_from(content: &str) -> String {
    content.chars().take(TITLE_MAX_CHARS).collect()
}
