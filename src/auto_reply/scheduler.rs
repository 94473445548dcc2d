// Deferred, cancellable auto-reply jobs keyed by chat id

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auto_reply::quote::{QuoteError, QuoteSource};
use crate::models::{Chat, Message, Sender};
use crate::realtime::{BroadcastHub, ChatEvent};
use crate::store::{ChatStore, StoreError};

/// Default delay between a user message and its auto-reply
pub const DEFAULT_AUTO_REPLY_DELAY: Duration = Duration::from_secs(3);

/// Reasons an auto-reply was dropped
#[derive(Debug, Error)]
pub enum AutoReplyError {
    #[error("quote fetch failed: {0}")]
    Quote(#[from] QuoteError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("chat {0} no longer exists")]
    ChatGone(Uuid),
}

type PendingJobs = HashMap<Uuid, HashMap<u64, AbortHandle>>;

struct Inner {
    store: Arc<dyn ChatStore>,
    hub: BroadcastHub,
    quotes: Arc<dyn QuoteSource>,
    delay: Duration,
    pending: Mutex<PendingJobs>,
    next_job_id: AtomicU64,
}

impl Inner {
    fn pending(&self) -> MutexGuard<'_, PendingJobs> {
        // A panicking job can't leave the map inconsistent; keep using it
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn reply(&self, chat_id: Uuid) -> Result<Chat, AutoReplyError> {
        let content = self.quotes.fetch_quote().await?;

        let chat = self
            .store
            .append_message(chat_id, &Message::new(content, Sender::System))
            .await?
            .ok_or(AutoReplyError::ChatGone(chat_id))?;
        self.hub.publish(ChatEvent::message(chat.clone()));
        Ok(chat)
    }

    fn finish(&self, chat_id: Uuid, job_id: u64) {
        let mut pending = self.pending();
        if let Some(jobs) = pending.get_mut(&chat_id) {
            jobs.remove(&job_id);
            if jobs.is_empty() {
                pending.remove(&chat_id);
            }
        }
    }
}

/// Schedules a system reply a fixed delay after each user message.
///
/// Every scheduled job is tracked until it completes, so pending replies for a
/// chat can be cancelled (e.g. when the chat is deleted). Job failures are
/// logged and dropped.
#[derive(Clone)]
pub struct AutoReplyScheduler {
    inner: Arc<Inner>,
}

impl AutoReplyScheduler {
    pub fn new(
        store: Arc<dyn ChatStore>,
        hub: BroadcastHub,
        quotes: Arc<dyn QuoteSource>,
        delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                hub,
                quotes,
                delay,
                pending: Mutex::new(HashMap::new()),
                next_job_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Schedule one auto-reply for `chat_id`. Must be called within a tokio runtime.
    pub fn schedule(&self, chat_id: Uuid) {
        let job_id = self.inner.next_job_id.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);

        // Hold the lock until the handle is recorded so the job can't finish first
        let mut pending = self.inner.pending();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(inner.delay).await;

            match inner.reply(chat_id).await {
                Ok(chat) => {
                    info!(chat_id = %chat_id, messages = chat.messages.len(), "auto-reply sent");
                }
                Err(AutoReplyError::ChatGone(_)) => {
                    warn!(chat_id = %chat_id, "auto-reply dropped, chat no longer exists");
                }
                Err(e) => {
                    warn!(chat_id = %chat_id, error = %e, "auto-reply failed");
                }
            }

            inner.finish(chat_id, job_id);
        });

        pending
            .entry(chat_id)
            .or_default()
            .insert(job_id, handle.abort_handle());
        debug!(
            chat_id = %chat_id,
            job_id,
            delay_ms = self.delay().as_millis() as u64,
            "auto-reply scheduled"
        );
    }

    /// Abort every pending reply for `chat_id`; returns how many were cancelled
    pub fn cancel(&self, chat_id: Uuid) -> usize {
        let jobs = self.inner.pending().remove(&chat_id).unwrap_or_default();
        for handle in jobs.values() {
            handle.abort();
        }
        if !jobs.is_empty() {
            info!(chat_id = %chat_id, cancelled = jobs.len(), "pending auto-replies cancelled");
        }
        jobs.len()
    }

    /// Number of replies still waiting or running for `chat_id`
    pub fn pending(&self, chat_id: Uuid) -> usize {
        self.inner
            .pending()
            .get(&chat_id)
            .map(|jobs| jobs.len())
            .unwrap_or(0)
    }

    pub fn total_pending(&self) -> usize {
        self.inner.pending().values().map(|jobs| jobs.len()).sum()
    }

    /// Abort every pending reply
    pub fn shutdown(&self) {
        let all = std::mem::take(&mut *self.inner.pending());
        let count: usize = all.values().map(|jobs| jobs.len()).sum();
        for handle in all.values().flat_map(|jobs| jobs.values()) {
            handle.abort();
        }
        if count > 0 {
            info!(cancelled = count, "auto-reply scheduler shut down");
        }
    }
}
