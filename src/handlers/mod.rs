// Handlers module

pub mod chats;
pub mod messages;
pub mod socket;

pub use chats::{
    create_chat_handler, delete_chat_handler, get_chat_handler, list_chats_handler,
    update_chat_handler,
};
pub use messages::{edit_message_handler, post_message_handler};
pub use socket::{health_handler, socket_handler};

use uuid::Uuid;

/// Path ids that don't parse can't name an existing record
pub(crate) fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}
