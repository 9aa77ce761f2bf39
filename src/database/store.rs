use async_trait::async_trait;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{Account, ChatRecord, ContactRequest, SourceContent, UserConfig, UserConfigPatch};

/// Chat history persistence. The relay writes through this seam.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Insert or replace the chat with `record.id`
    async fn upsert_chat(&self, record: &ChatRecord) -> Result<(), DatabaseError>;

    async fn get_chat(&self, user_id: Uuid, chat_id: &str) -> Result<Option<ChatRecord>, DatabaseError>;

    /// Non-newsletter chats for the user, newest first
    async fn list_chats(&self, user_id: Uuid) -> Result<Vec<ChatRecord>, DatabaseError>;

    /// Returns false when the user owns no chat with that id
    async fn delete_chat(&self, user_id: Uuid, chat_id: &str) -> Result<bool, DatabaseError>;

    async fn clear_chats(&self, user_id: Uuid) -> Result<u64, DatabaseError>;
}

/// Users, per-user configuration, scraped source content and the contact form
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_account(&self, user_id: Uuid) -> Result<Option<Account>, DatabaseError>;

    /// Decrement the free search allowance, never below zero.
    /// Returns the new value, or `None` when the user row does not exist.
    async fn consume_free_search(&self, user_id: Uuid) -> Result<Option<i32>, DatabaseError>;

    async fn get_user_config(&self, user_id: Uuid) -> Result<Option<UserConfig>, DatabaseError>;

    async fn upsert_user_config(&self, user_id: Uuid, patch: UserConfigPatch) -> Result<(), DatabaseError>;

    async fn insert_source_contents(
        &self,
        user_id: Uuid,
        chat_id: &str,
        sources: Vec<SourceContent>,
    ) -> Result<u64, DatabaseError>;

    async fn insert_contact(&self, contact: ContactRequest) -> Result<(), DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}
