//! Message persistence

use super::{generate_id, Database};
use crate::chat::Role;
use crate::error::{MaiSaleError, Result};
use chrono::Utc;
use rusqlite::params;

/// A stored conversation message
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MessageRecord {
    pub id: String,
    pub conversation_id: String,
    pub sender: Role,
    pub text: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
}

impl MessageRecord {
    /// Value of a top-level string key in the metadata object
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }
}

impl Database {
    /// Append a message to a conversation and bump its activity time
    pub fn create_message(
        &self,
        conversation_id: &str,
        sender: Role,
        text: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<MessageRecord> {
        if self.get_conversation(conversation_id)?.is_none() {
            return Err(MaiSaleError::ConversationNotFound(
                conversation_id.to_string(),
            ));
        }

        let id = generate_id();
        let now = Utc::now().to_rfc3339();
        let metadata_json = metadata.map(serde_json::to_string).transpose()?;

        self.conn().execute(
            "INSERT INTO messages (id, conversation_id, sender, text, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, conversation_id, sender.as_str(), text, metadata_json, now],
        )?;
        self.touch_conversation(conversation_id)?;

        Ok(MessageRecord {
            id,
            conversation_id: conversation_id.to_string(),
            sender,
            text: text.to_string(),
            metadata: metadata.cloned(),
            created_at: now,
        })
    }

    /// Full message history of a conversation, oldest first
    pub fn get_messages_history(&self, conversation_id: &str) -> Result<Vec<MessageRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, sender, text, metadata, created_at
             FROM messages WHERE conversation_id = ?1
             ORDER BY seq ASC",
        )?;

        let rows = stmt.query_map(params![conversation_id], |row| {
            let sender: String = row.get(2)?;
            let metadata_json: Option<String> = row.get(4)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                sender,
                row.get::<_, String>(3)?,
                metadata_json,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let (id, conversation_id, sender, text, metadata_json, created_at) = row?;
            let sender = sender.parse::<Role>()?;
            messages.push(MessageRecord {
                id,
                conversation_id,
                sender,
                text,
                metadata: metadata_json.and_then(|j| serde_json::from_str(&j).ok()),
                created_at,
            });
        }
        Ok(messages)
    }

    pub fn count_messages(&self, conversation_id: &str) -> Result<usize> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
            params![conversation_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let conv = db.create_conversation("u1", None).unwrap();
        (db, conv.id)
    }

    #[test]
    fn test_history_is_ordered() {
        let (db, conv) = setup();
        db.create_message(&conv, Role::User, "xin chào", None).unwrap();
        db.create_message(&conv, Role::Assistant, "Chào anh", None)
            .unwrap();
        db.create_message(&conv, Role::User, "giá bao nhiêu", None)
            .unwrap();

        let history = db.get_messages_history(&conv).unwrap();
        let texts: Vec<&str> = history.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["xin chào", "Chào anh", "giá bao nhiêu"]);
        assert_eq!(history[1].sender, Role::Assistant);
        assert_eq!(db.count_messages(&conv).unwrap(), 3);
    }

    #[test]
    fn test_metadata_round_trips() {
        let (db, conv) = setup();
        let meta = serde_json::json!({"kind": "clarify"});
        db.create_message(&conv, Role::Assistant, "?", Some(&meta))
            .unwrap();
        let history = db.get_messages_history(&conv).unwrap();
        assert_eq!(history[0].metadata_str("kind"), Some("clarify"));
    }

    #[test]
    fn test_unknown_conversation_rejected() {
        let (db, _) = setup();
        assert!(matches!(
            db.create_message("missing", Role::User, "hi", None),
            Err(MaiSaleError::ConversationNotFound(_))
        ));
    }

    #[test]
    fn test_histories_are_isolated() {
        let (db, conv) = setup();
        let other = db.create_conversation("u2", None).unwrap();
        db.create_message(&conv, Role::User, "a", None).unwrap();
        db.create_message(&other.id, Role::User, "b", None).unwrap();
        assert_eq!(db.get_messages_history(&conv).unwrap().len(), 1);
        assert_eq!(db.get_messages_history(&other.id).unwrap()[0].text, "b");
    }
}
