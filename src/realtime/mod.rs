//! Real-time fan-out of chat events to WebSocket clients
//!
//! Chat operations publish [`ChatEvent`]s into a [`BroadcastHub`]; every
//! connected socket runs a session that forwards those events, filtered by
//! the hub's [`BroadcastScope`] and the rooms the client joined.

pub mod hub;
pub mod session;

pub use hub::{BroadcastHub, BroadcastScope, ChatEvent, EventKind};
pub use session::{run_session, ClientEvent};
