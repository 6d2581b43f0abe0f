//! Collaborator contracts for conversation storage and the vector index
//!
//! The pipeline only talks to these traits; [`Database`] implements both.

use crate::chat::Role;
use crate::db::{ConversationInfo, Database, MessageRecord};
use crate::error::Result;
use crate::retrieval::{MetadataFilter, RetrievalResult, VectorEntry};
use async_trait::async_trait;

/// Keyed conversation/message storage with per-conversation insertion order
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn create_conversation(
        &self,
        user_id: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<ConversationInfo>;

    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<ConversationInfo>>;

    /// Messages of a conversation, oldest first
    async fn load(&self, conversation_id: &str) -> Result<Vec<MessageRecord>>;

    async fn append(
        &self,
        conversation_id: &str,
        sender: Role,
        text: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<MessageRecord>;

    async fn ping(&self) -> Result<()>;
}

/// Similarity index over embedded snippets
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievalResult>>;

    async fn upsert(&self, entries: Vec<VectorEntry>, model: &str) -> Result<usize>;

    /// Remove every entry indexed from `source`
    async fn delete_source(&self, source: &str) -> Result<usize>;
}

#[async_trait]
impl HistoryStore for Database {
    async fn create_conversation(
        &self,
        user_id: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<ConversationInfo> {
        Database::create_conversation(self, user_id, metadata.as_ref())
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<ConversationInfo>> {
        Database::get_conversation(self, conversation_id)
    }

    async fn load(&self, conversation_id: &str) -> Result<Vec<MessageRecord>> {
        self.get_messages_history(conversation_id)
    }

    async fn append(
        &self,
        conversation_id: &str,
        sender: Role,
        text: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<MessageRecord> {
        self.create_message(conversation_id, sender, text, metadata.as_ref())
    }

    async fn ping(&self) -> Result<()> {
        Database::ping(self)
    }
}

#[async_trait]
impl VectorIndex for Database {
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievalResult>> {
        self.query_vectors(embedding, top_k, filter)
    }

    async fn upsert(&self, entries: Vec<VectorEntry>, model: &str) -> Result<usize> {
        self.upsert_vectors(&entries, model)
    }

    async fn delete_source(&self, source: &str) -> Result<usize> {
        self.delete_vectors_by_source(source)
    }
}
