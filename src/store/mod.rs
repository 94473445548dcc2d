//! Chat document store
//!
//! Each chat is persisted as a single document that embeds its ordered
//! message list. Two implementations are provided:
//!
//! - [`PgChatStore`]: PostgreSQL, one row per chat with the messages in a JSONB column
//! - [`InMemoryChatStore`]: process-local map, used for tests and local runs
//!
//! Appending a message is a single atomic write ([`ChatStore::append_message`]).
//! Every other save is a compare-and-set on [`Chat::version`]; callers that
//! load, mutate and save a chat should go through [`update_with_retry`]
//! so that concurrent writers to the same chat never lose an update.

pub mod connection;
pub mod error;
pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Chat, Message};

pub use connection::StoreConfig;
pub use error::{Result, StoreError};
pub use memory::InMemoryChatStore;
pub use postgres::PgChatStore;

/// Number of load-mutate-save attempts before a conflict is reported
pub const MAX_UPDATE_ATTEMPTS: usize = 32;

/// Upper bound of the randomized wait between conflicting attempts
const MAX_RETRY_BACKOFF: Duration = Duration::from_millis(50);

#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Persist a new chat
    async fn insert(&self, chat: &Chat) -> Result<()>;

    /// Load a chat by id, `None` if it doesn't exist
    async fn get(&self, id: Uuid) -> Result<Option<Chat>>;

    /// All chats, most recently updated first
    async fn list(&self) -> Result<Vec<Chat>>;

    /// Save a previously loaded chat.
    ///
    /// Succeeds only if the stored version still equals `chat.version`.
    /// Returns the stored document with its version incremented and
    /// `updated_at` refreshed.
    ///
    /// # Errors
    ///
    /// * `StoreError::NotFound` - the chat was deleted
    /// * `StoreError::Concurrency` - another writer saved first
    async fn save(&self, chat: &Chat) -> Result<Chat>;

    /// Append `message` to a chat in one atomic write.
    ///
    /// Bumps the version and refreshes `updated_at` like [`ChatStore::save`],
    /// but never conflicts with other writers. Returns `None` if the chat
    /// doesn't exist.
    async fn append_message(&self, chat_id: Uuid, message: &Message) -> Result<Option<Chat>>;

    /// Delete a chat and its messages; returns whether it existed
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Load a chat, apply `apply` to it and save it, retrying on version conflicts.
///
/// Returns `Ok(None)` if the chat doesn't exist (or is deleted mid-update),
/// otherwise the saved chat together with the value returned by `apply`.
/// An error returned by `apply` aborts the update without saving.
pub async fn update_with_retry<T, E, F>(
    store: &dyn ChatStore,
    id: Uuid,
    mut apply: F,
) -> std::result::Result<Option<(Chat, T)>, E>
where
    F: FnMut(&mut Chat) -> std::result::Result<T, E> + Send,
    T: Send,
    E: From<StoreError>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;

        let Some(mut chat) = store.get(id).await? else {
            return Ok(None);
        };

        let output = apply(&mut chat)?;

        match store.save(&chat).await {
            Ok(saved) => return Ok(Some((saved, output))),
            Err(StoreError::NotFound(_)) => return Ok(None),
            Err(StoreError::Concurrency { .. }) if attempt < MAX_UPDATE_ATTEMPTS => {
                let wait = retry_backoff(attempt);
                debug!(
                    chat_id = %id,
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    "chat changed while updating, retrying"
                );
                tokio::time::sleep(wait).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Jittered wait before retry `attempt`, growing linearly up to [`MAX_RETRY_BACKOFF`]
fn retry_backoff(attempt: usize) -> Duration {
    let ceiling = (attempt as u64 * 2).min(MAX_RETRY_BACKOFF.as_millis() as u64);
    Duration::from_millis(rand::thread_rng().gen_range(0..=ceiling))
}
