// Data structures (Chat, Message, request bodies, list projection)

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Base URL of the avatar service; an image index is appended.
pub const AVATAR_BASE_URL: &str = "https://i.pravatar.cc/150?img=";

/// Number of distinct avatars offered by the avatar service.
pub const AVATAR_COUNT: u32 = 50;

/// Pick a random avatar URL with an index in `1..=AVATAR_COUNT`.
pub fn random_avatar() -> String {
    let index = rand::thread_rng().gen_range(1..=AVATAR_COUNT);
    format!("{}{}", AVATAR_BASE_URL, index)
}

/// Who authored a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Sender {
    User,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message stamped with the current time
    pub fn new(content: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            sender,
            timestamp: Utc::now(),
        }
    }
}

/// A chat thread with its embedded, ordered message history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub avatar: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented on every save; used for compare-and-set updates
    #[serde(rename = "__v", default)]
    pub version: i64,
}

impl Chat {
    /// Create a new, unsaved chat with a random avatar and no messages
    pub fn new(first_name: Option<String>, last_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            avatar: random_avatar(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn find_message_mut(&mut self, message_id: Uuid) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }

    /// Project the chat into its list entry
    pub fn summary(&self) -> ChatSummary {
        ChatSummary {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            last_message: self.last_message().cloned(),
            avatar: self.avatar.clone(),
        }
    }
}

/// List entry returned by `GET /chats`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Message>,
    pub avatar: String,
}

// Request Types
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatNamesRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageContentRequest {
    #[serde(default)]
    pub content: String,
}

/// Plain `{ "message": ... }` body used for confirmations and errors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusMessage {
    pub message: String,
}

impl StatusMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
