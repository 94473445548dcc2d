use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::models::Chat;

/// Events buffered per subscriber before it starts skipping
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Kind of chat event pushed to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// A message was appended
    Message,
    /// A message's content was edited
    MessageUpdated,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Message => "message",
            EventKind::MessageUpdated => "messageUpdated",
        }
    }
}

/// An event carrying the full chat after the change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEvent {
    pub event: EventKind,
    pub data: Chat,
}

impl ChatEvent {
    pub fn message(chat: Chat) -> Self {
        Self {
            event: EventKind::Message,
            data: chat,
        }
    }

    pub fn message_updated(chat: Chat) -> Self {
        Self {
            event: EventKind::MessageUpdated,
            data: chat,
        }
    }

    pub fn chat_id(&self) -> Uuid {
        self.data.id
    }
}

/// Which connected clients receive a chat event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BroadcastScope {
    /// Every connected client
    #[default]
    Global,
    /// Only clients that joined the chat's room
    Room,
}

impl FromStr for BroadcastScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(BroadcastScope::Global),
            "room" => Ok(BroadcastScope::Room),
            other => Err(format!("unknown broadcast scope '{}'", other)),
        }
    }
}

/// Fan-out point between chat operations and WebSocket sessions
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    sender: broadcast::Sender<ChatEvent>,
    scope: BroadcastScope,
}

impl BroadcastHub {
    pub fn new(scope: BroadcastScope) -> Self {
        Self::with_capacity(scope, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(scope: BroadcastScope, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, scope }
    }

    pub fn scope(&self) -> BroadcastScope {
        self.scope
    }

    /// Publish an event without waiting for delivery.
    ///
    /// Returns the number of sessions that will see it; having none is not an error.
    pub fn publish(&self, event: ChatEvent) -> usize {
        let kind = event.event;
        let chat_id = event.chat_id();
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(chat_id = %chat_id, event = kind.as_str(), receivers, "event published");
                receivers
            }
            Err(_) => {
                debug!(chat_id = %chat_id, event = kind.as_str(), "no subscribers for event");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(BroadcastScope::default())
    }
}
