use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Chat, Message};
use crate::store::{
    error::{Result, StoreError},
    ChatStore,
};

/// Process-local chat store
#[derive(Default)]
pub struct InMemoryChatStore {
    chats: RwLock<HashMap<Uuid, Chat>>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.chats.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.chats.read().await.is_empty()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn insert(&self, chat: &Chat) -> Result<()> {
        let mut chats = self.chats.write().await;
        if chats.contains_key(&chat.id) {
            return Err(StoreError::Validation(format!(
                "chat {} already exists",
                chat.id
            )));
        }
        chats.insert(chat.id, chat.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Chat>> {
        Ok(self.chats.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Chat>> {
        let mut chats: Vec<Chat> = self.chats.read().await.values().cloned().collect();
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(chats)
    }

    async fn save(&self, chat: &Chat) -> Result<Chat> {
        let mut chats = self.chats.write().await;
        let stored = chats.get_mut(&chat.id).ok_or(StoreError::NotFound(chat.id))?;

        if stored.version != chat.version {
            return Err(StoreError::Concurrency {
                chat_id: chat.id,
                expected_version: chat.version,
            });
        }

        let mut saved = chat.clone();
        saved.version += 1;
        saved.updated_at = Utc::now();
        *stored = saved.clone();
        Ok(saved)
    }

    async fn append_message(&self, chat_id: Uuid, message: &Message) -> Result<Option<Chat>> {
        let mut chats = self.chats.write().await;
        let Some(stored) = chats.get_mut(&chat_id) else {
            return Ok(None);
        };

        stored.messages.push(message.clone());
        stored.version += 1;
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.chats.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Message, Sender};
    use std::time::Duration;

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryChatStore::new();
        let chat = Chat::new(Some("Ada".to_string()), Some("Lovelace".to_string()));
        store.insert(&chat).await.unwrap();

        let loaded = store.get(chat.id).await.unwrap().unwrap();
        assert_eq!(loaded, chat);
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_duplicate_rejected() {
        let store = InMemoryChatStore::new();
        let chat = Chat::new(None, None);
        store.insert(&chat).await.unwrap();
        assert!(store.insert(&chat).await.is_err());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_save_bumps_version() {
        let store = InMemoryChatStore::new();
        let mut chat = Chat::new(None, None);
        store.insert(&chat).await.unwrap();

        chat.messages.push(Message::new("hi", Sender::User));
        let saved = store.save(&chat).await.unwrap();

        assert_eq!(saved.version, 1);
        assert!(saved.updated_at >= chat.updated_at);
        assert_eq!(store.get(chat.id).await.unwrap().unwrap(), saved);
    }

    #[tokio::test]
    async fn test_save_stale_version_conflicts() {
        let store = InMemoryChatStore::new();
        let chat = Chat::new(None, None);
        store.insert(&chat).await.unwrap();

        store.save(&chat).await.unwrap();
        let err = store.save(&chat).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Concurrency {
                expected_version: 0,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_save_missing_chat() {
        let store = InMemoryChatStore::new();
        let chat = Chat::new(None, None);
        assert!(matches!(
            store.save(&chat).await.unwrap_err(),
            StoreError::NotFound(id) if id == chat.id
        ));
    }

    #[tokio::test]
    async fn test_append_message() {
        let store = InMemoryChatStore::new();
        let chat = Chat::new(None, None);
        store.insert(&chat).await.unwrap();

        let message = Message::new("hi", Sender::User);
        let appended = store.append_message(chat.id, &message).await.unwrap().unwrap();
        assert_eq!(appended.messages, vec![message]);
        assert_eq!(appended.version, 1);
        assert_eq!(store.get(chat.id).await.unwrap().unwrap(), appended);

        // A copy loaded before the append is now stale
        assert!(matches!(
            store.save(&chat).await.unwrap_err(),
            StoreError::Concurrency { .. }
        ));

        let missing = store
            .append_message(Uuid::new_v4(), &Message::new("x", Sender::User))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_list_most_recently_updated_first() {
        let store = InMemoryChatStore::new();
        let first = Chat::new(Some("first".to_string()), None);
        store.insert(&first).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = Chat::new(Some("second".to_string()), None);
        store.insert(&second).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let ids: Vec<Uuid> = store.list().await.unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        // Touching the older chat moves it to the front
        store.save(&first).await.unwrap();
        let ids: Vec<Uuid> = store.list().await.unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryChatStore::new();
        let chat = Chat::new(None, None);
        store.insert(&chat).await.unwrap();

        assert!(store.delete(chat.id).await.unwrap());
        assert!(!store.delete(chat.id).await.unwrap());
        assert!(store.is_empty().await);
    }
}
