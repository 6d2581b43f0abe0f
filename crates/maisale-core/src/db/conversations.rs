//! Conversation records

use super::{generate_id, Database};
use crate::error::{MaiSaleError, Result};
use chrono::Utc;
use rusqlite::params;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ConversationInfo {
    pub id: String,
    pub user_id: String,
    pub created_at: String,
    pub last_active_at: String,
    pub metadata: Option<serde_json::Value>,
}

impl Database {
    pub fn create_conversation(
        &self,
        user_id: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<ConversationInfo> {
        if user_id.trim().is_empty() {
            return Err(MaiSaleError::InvalidInput(
                "user_id must not be empty".to_string(),
            ));
        }

        let id = generate_id();
        let now = Utc::now().to_rfc3339();
        let metadata_json = metadata.map(serde_json::to_string).transpose()?;

        self.conn().execute(
            "INSERT INTO conversations (id, user_id, created_at, last_active_at, metadata)
             VALUES (?1, ?2, ?3, ?3, ?4)",
            params![id, user_id, now, metadata_json],
        )?;

        tracing::debug!("Created conversation {} for user {}", id, user_id);

        Ok(ConversationInfo {
            id,
            user_id: user_id.to_string(),
            created_at: now.clone(),
            last_active_at: now,
            metadata: metadata.cloned(),
        })
    }

    pub fn get_conversation(&self, conversation_id: &str) -> Result<Option<ConversationInfo>> {
        let result = self.conn().query_row(
            "SELECT id, user_id, created_at, last_active_at, metadata
             FROM conversations WHERE id = ?1",
            params![conversation_id],
            |row| {
                let metadata_json: Option<String> = row.get(4)?;
                Ok(ConversationInfo {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    created_at: row.get(2)?,
                    last_active_at: row.get(3)?,
                    metadata: metadata_json.and_then(|j| serde_json::from_str(&j).ok()),
                })
            },
        );
        match result {
            Ok(info) => Ok(Some(info)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch a conversation or fail with `ConversationNotFound`
    pub fn require_conversation(&self, conversation_id: &str) -> Result<ConversationInfo> {
        self.get_conversation(conversation_id)?
            .ok_or_else(|| MaiSaleError::ConversationNotFound(conversation_id.to_string()))
    }

    pub fn touch_conversation(&self, conversation_id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "UPDATE conversations SET last_active_at = ?2 WHERE id = ?1",
            params![conversation_id, now],
        )?;
        Ok(())
    }

    /// Most recently active conversations of a user
    pub fn list_conversations(&self, user_id: &str, limit: usize) -> Result<Vec<ConversationInfo>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, created_at, last_active_at, metadata
             FROM conversations WHERE user_id = ?1
             ORDER BY last_active_at DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![user_id, limit as i64], |row| {
                let metadata_json: Option<String> = row.get(4)?;
                Ok(ConversationInfo {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    created_at: row.get(2)?,
                    last_active_at: row.get(3)?,
                    metadata: metadata_json.and_then(|j| serde_json::from_str(&j).ok()),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
