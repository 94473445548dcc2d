//! Chat and message operations shared by the HTTP handlers

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::auto_reply::AutoReplyScheduler;
use crate::error::ApiError;
use crate::models::{Chat, ChatSummary, Message, Sender};
use crate::realtime::{BroadcastHub, ChatEvent};
use crate::store::{update_with_retry, ChatStore};

/// Owns the injected store, event hub and auto-reply scheduler
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ChatStore>,
    hub: BroadcastHub,
    auto_reply: AutoReplyScheduler,
}

impl ChatService {
    pub fn new(store: Arc<dyn ChatStore>, hub: BroadcastHub, auto_reply: AutoReplyScheduler) -> Self {
        Self {
            store,
            hub,
            auto_reply,
        }
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    pub fn auto_reply(&self) -> &AutoReplyScheduler {
        &self.auto_reply
    }

    pub async fn create_chat(
        &self,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<Chat, ApiError> {
        let chat = Chat::new(first_name, last_name);
        self.store.insert(&chat).await?;
        info!(chat_id = %chat.id, "chat created");
        Ok(chat)
    }

    /// All chats as summaries, most recently updated first
    pub async fn list_chats(&self) -> Result<Vec<ChatSummary>, ApiError> {
        let chats = self.store.list().await?;
        Ok(chats.iter().map(Chat::summary).collect())
    }

    pub async fn get_chat(&self, chat_id: Uuid) -> Result<Chat, ApiError> {
        self.store.get(chat_id).await?.ok_or(ApiError::ChatNotFound)
    }

    /// Replace the names that are supplied; absent names are left unchanged
    pub async fn update_chat(
        &self,
        chat_id: Uuid,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<Chat, ApiError> {
        let (chat, ()) = update_with_retry::<_, ApiError, _>(self.store.as_ref(), chat_id, |chat| {
            if let Some(first_name) = &first_name {
                chat.first_name = Some(first_name.clone());
            }
            if let Some(last_name) = &last_name {
                chat.last_name = Some(last_name.clone());
            }
            Ok(())
        })
        .await?
        .ok_or(ApiError::ChatNotFound)?;

        info!(chat_id = %chat_id, "chat updated");
        Ok(chat)
    }

    /// Delete a chat with its messages and drop its pending auto-replies
    pub async fn delete_chat(&self, chat_id: Uuid) -> Result<(), ApiError> {
        if !self.store.delete(chat_id).await? {
            return Err(ApiError::ChatNotFound);
        }
        self.auto_reply.cancel(chat_id);
        info!(chat_id = %chat_id, "chat deleted");
        Ok(())
    }

    /// Append a user message, broadcast the chat and schedule the auto-reply
    pub async fn post_message(&self, chat_id: Uuid, content: String) -> Result<Chat, ApiError> {
        let message = Message::new(content, Sender::User);
        let chat = self
            .store
            .append_message(chat_id, &message)
            .await?
            .ok_or(ApiError::ChatNotFound)?;

        info!(chat_id = %chat_id, message_id = %message.id, "message posted");
        self.hub.publish(ChatEvent::message(chat.clone()));
        self.auto_reply.schedule(chat_id);
        Ok(chat)
    }

    /// Change the content of one message; sender and timestamp stay as they were
    pub async fn edit_message(
        &self,
        chat_id: Uuid,
        message_id: Uuid,
        content: String,
    ) -> Result<Chat, ApiError> {
        let (chat, ()) = update_with_retry::<_, ApiError, _>(self.store.as_ref(), chat_id, |chat| {
            let message = chat
                .find_message_mut(message_id)
                .ok_or(ApiError::MessageNotFound)?;
            message.content = content.clone();
            Ok(())
        })
        .await?
        .ok_or(ApiError::ChatNotFound)?;

        info!(chat_id = %chat_id, message_id = %message_id, "message edited");
        self.hub.publish(ChatEvent::message_updated(chat.clone()));
        Ok(chat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auto_reply::StaticQuoteSource;
    use crate::realtime::EventKind;
    use crate::store::InMemoryChatStore;
    use std::time::Duration;
    use tokio::sync::broadcast;

    fn service_with_delay(delay: Duration) -> ChatService {
        let store: Arc<dyn ChatStore> = Arc::new(InMemoryChatStore::new());
        let hub = BroadcastHub::default();
        let quotes = Arc::new(StaticQuoteSource::new("A quote."));
        let auto_reply = AutoReplyScheduler::new(store.clone(), hub.clone(), quotes, delay);
        ChatService::new(store, hub, auto_reply)
    }

    fn service() -> ChatService {
        // Long enough that no reply lands during a test
        service_with_delay(Duration::from_secs(60))
    }

    fn drain(events: &mut broadcast::Receiver<ChatEvent>) -> Vec<ChatEvent> {
        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }
        received
    }

    #[tokio::test]
    async fn test_create_chat() {
        let service = service();
        let chat = service
            .create_chat(Some("Ada".to_string()), Some("Lovelace".to_string()))
            .await
            .unwrap();

        assert!(chat.messages.is_empty());
        assert!(chat.avatar.starts_with(crate::models::AVATAR_BASE_URL));
        assert_eq!(service.get_chat(chat.id).await.unwrap(), chat);
    }

    #[tokio::test]
    async fn test_create_chat_accepts_missing_names() {
        let service = service();
        let chat = service.create_chat(None, None).await.unwrap();
        assert!(chat.first_name.is_none());
        assert!(chat.last_name.is_none());
    }

    #[tokio::test]
    async fn test_get_missing_chat() {
        let service = service();
        assert!(matches!(
            service.get_chat(Uuid::new_v4()).await,
            Err(ApiError::ChatNotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_chat() {
        let service = service();
        let chat = service
            .create_chat(Some("Ada".to_string()), Some("Lovelace".to_string()))
            .await
            .unwrap();

        let updated = service
            .update_chat(chat.id, Some("Augusta".to_string()), None)
            .await
            .unwrap();

        assert_eq!(updated.first_name.as_deref(), Some("Augusta"));
        assert_eq!(updated.last_name.as_deref(), Some("Lovelace"));
        assert_eq!(updated.avatar, chat.avatar);
    }

    #[tokio::test]
    async fn test_update_missing_chat_mutates_nothing() {
        let service = service();
        let chat = service.create_chat(Some("Ada".to_string()), None).await.unwrap();

        let result = service
            .update_chat(Uuid::new_v4(), Some("Grace".to_string()), None)
            .await;
        assert!(matches!(result, Err(ApiError::ChatNotFound)));

        let chats = service.list_chats().await.unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].first_name.as_deref(), Some("Ada"));
        assert_eq!(service.get_chat(chat.id).await.unwrap(), chat);
    }

    #[tokio::test]
    async fn test_delete_chat() {
        let service = service();
        let chat = service.create_chat(None, None).await.unwrap();

        service.delete_chat(chat.id).await.unwrap();
        assert!(matches!(
            service.get_chat(chat.id).await,
            Err(ApiError::ChatNotFound)
        ));
        assert!(matches!(
            service.delete_chat(chat.id).await,
            Err(ApiError::ChatNotFound)
        ));
    }

    #[tokio::test]
    async fn test_post_message_appends_and_broadcasts_once() {
        let service = service();
        let mut events = service.hub().subscribe();
        let chat = service.create_chat(Some("Ada".to_string()), None).await.unwrap();

        let updated = service.post_message(chat.id, "hi".to_string()).await.unwrap();

        assert_eq!(updated.messages.len(), 1);
        assert_eq!(updated.messages[0].content, "hi");
        assert_eq!(updated.messages[0].sender, Sender::User);

        let received = drain(&mut events);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].event, EventKind::Message);
        assert_eq!(received[0].data, updated);

        assert_eq!(service.auto_reply().pending(chat.id), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_posts_all_succeed() {
        let service = service();
        let chat_id = service.create_chat(None, None).await.unwrap().id;

        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service.post_message(chat_id, format!("message {}", i)).await
                })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }

        let stored = service.get_chat(chat_id).await.unwrap();
        assert_eq!(stored.messages.len(), 64);
        assert_eq!(stored.version, 64);
        assert_eq!(service.auto_reply().pending(chat_id), 64);
        service.auto_reply().shutdown();
    }

    #[tokio::test]
    async fn test_post_message_to_missing_chat() {
        let service = service();
        let mut events = service.hub().subscribe();

        let result = service.post_message(Uuid::new_v4(), "hi".to_string()).await;
        assert!(matches!(result, Err(ApiError::ChatNotFound)));
        assert!(drain(&mut events).is_empty());
        assert_eq!(service.auto_reply().total_pending(), 0);
    }

    #[tokio::test]
    async fn test_edit_message_changes_only_content() {
        let service = service();
        let chat = service.create_chat(None, None).await.unwrap();
        let posted = service.post_message(chat.id, "hi".to_string()).await.unwrap();
        let original = posted.messages[0].clone();
        let mut events = service.hub().subscribe();

        let edited = service
            .edit_message(chat.id, original.id, "hello".to_string())
            .await
            .unwrap();

        let message = &edited.messages[0];
        assert_eq!(message.id, original.id);
        assert_eq!(message.content, "hello");
        assert_eq!(message.sender, original.sender);
        assert_eq!(message.timestamp, original.timestamp);

        let received = drain(&mut events);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].event, EventKind::MessageUpdated);
        assert_eq!(received[0].data, edited);
    }

    #[tokio::test]
    async fn test_edit_missing_message() {
        let service = service();
        let chat = service.create_chat(None, None).await.unwrap();
        service.post_message(chat.id, "hi".to_string()).await.unwrap();

        let result = service
            .edit_message(chat.id, Uuid::new_v4(), "x".to_string())
            .await;
        assert!(matches!(result, Err(ApiError::MessageNotFound)));

        let result = service
            .edit_message(Uuid::new_v4(), Uuid::new_v4(), "x".to_string())
            .await;
        assert!(matches!(result, Err(ApiError::ChatNotFound)));

        assert_eq!(service.get_chat(chat.id).await.unwrap().messages[0].content, "hi");
    }

    #[tokio::test]
    async fn test_list_chats_order_and_last_message() {
        let service = service();
        let older = service.create_chat(Some("older".to_string()), None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let newer = service.create_chat(Some("newer".to_string()), None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let chats = service.list_chats().await.unwrap();
        assert_eq!(chats[0].id, newer.id);
        assert_eq!(chats[1].id, older.id);
        assert!(chats[0].last_message.is_none());

        let posted = service.post_message(older.id, "bump".to_string()).await.unwrap();
        let chats = service.list_chats().await.unwrap();
        assert_eq!(chats[0].id, older.id);
        assert_eq!(chats[0].last_message.as_ref(), posted.messages.last());
    }

    #[tokio::test]
    async fn test_auto_reply_follows_user_message() {
        let service = service_with_delay(Duration::from_millis(30));
        let chat = service.create_chat(Some("Ada".to_string()), None).await.unwrap();
        let mut events = service.hub().subscribe();

        service.post_message(chat.id, "hi".to_string()).await.unwrap();
        let first = events.recv().await.unwrap();
        assert_eq!(first.data.messages.len(), 1);

        let second = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("auto-reply should arrive")
            .unwrap();
        assert_eq!(second.event, EventKind::Message);
        assert_eq!(second.data.messages.len(), 2);
        assert_eq!(second.data.messages[1].sender, Sender::System);
        assert_eq!(second.data.messages[1].content, "A quote.");
    }

    #[tokio::test]
    async fn test_delete_cancels_pending_auto_reply() {
        let service = service();
        let chat = service.create_chat(None, None).await.unwrap();
        service.post_message(chat.id, "hi".to_string()).await.unwrap();
        assert_eq!(service.auto_reply().pending(chat.id), 1);

        service.delete_chat(chat.id).await.unwrap();
        assert_eq!(service.auto_reply().pending(chat.id), 0);
    }
}
