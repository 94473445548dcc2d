// One WebSocket client: room membership plus forwarding of hub events

use std::collections::HashSet;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, info, warn};
use uuid::Uuid;
use warp::ws::{Message, WebSocket};

use super::hub::{BroadcastScope, ChatEvent};

/// Frames a client may send
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Join the room of a chat
    JoinChat(String),
}

/// Parse a text frame from a client
pub fn parse_client_frame(text: &str) -> Result<ClientEvent, serde_json::Error> {
    serde_json::from_str(text)
}

/// Whether a session that joined `rooms` should receive `event`
pub fn should_deliver(scope: BroadcastScope, rooms: &HashSet<Uuid>, event: &ChatEvent) -> bool {
    match scope {
        BroadcastScope::Global => true,
        BroadcastScope::Room => rooms.contains(&event.chat_id()),
    }
}

/// Drive a connected client until it disconnects.
///
/// `events` must be subscribed before the upgrade completes so that nothing
/// published after the handshake is missed.
pub async fn run_session(
    socket: WebSocket,
    events: broadcast::Receiver<ChatEvent>,
    scope: BroadcastScope,
) {
    let session_id = Uuid::new_v4();
    info!(session_id = %session_id, "New client connected");

    let (mut outgoing, mut incoming) = socket.split();
    let mut events = BroadcastStream::new(events);
    let mut rooms: HashSet<Uuid> = HashSet::new();

    loop {
        tokio::select! {
            frame = incoming.next() => match frame {
                Some(Ok(frame)) => {
                    if frame.is_close() {
                        break;
                    }
                    if let Ok(text) = frame.to_str() {
                        handle_client_frame(session_id, text, &mut rooms);
                    }
                }
                Some(Err(e)) => {
                    warn!(session_id = %session_id, error = %e, "websocket receive failed");
                    break;
                }
                None => break,
            },
            event = events.next() => match event {
                Some(Ok(event)) => {
                    if !should_deliver(scope, &rooms, &event) {
                        continue;
                    }
                    let payload = match serde_json::to_string(&event) {
                        Ok(payload) => payload,
                        Err(e) => {
                            warn!(session_id = %session_id, error = %e, "failed to encode event");
                            continue;
                        }
                    };
                    if let Err(e) = outgoing.send(Message::text(payload)).await {
                        debug!(session_id = %session_id, error = %e, "websocket send failed");
                        break;
                    }
                }
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    warn!(session_id = %session_id, skipped, "client lagging, events dropped");
                }
                None => break,
            },
        }
    }

    info!(session_id = %session_id, "Client disconnected");
}

fn handle_client_frame(session_id: Uuid, text: &str, rooms: &mut HashSet<Uuid>) {
    match parse_client_frame(text) {
        Ok(ClientEvent::JoinChat(chat_id)) => match Uuid::parse_str(chat_id.trim()) {
            Ok(chat_id) => {
                rooms.insert(chat_id);
                info!(session_id = %session_id, chat_id = %chat_id, "Client joined chat");
            }
            Err(_) => {
                warn!(session_id = %session_id, chat_id = %chat_id, "joinChat with invalid chat id");
            }
        },
        Err(e) => {
            debug!(session_id = %session_id, error = %e, "ignoring unrecognized client frame");
        }
    }
}
