//! Knowledge retrieval
//!
//! Embeds the user's question, pulls the nearest stored snippets out of the
//! vector index (optionally scoped to a conversation and/or user) and reorders
//! them with a context-aware boost.

mod filter;
mod reranker;
mod retriever;

pub use filter::{MetadataField, MetadataFilter};
pub use reranker::{rerank, rerank_score, CONVERSATION_BOOST, USER_BOOST};
pub use retriever::{KnowledgeRetriever, DEFAULT_TOP_K};

use serde::{Deserialize, Serialize};

/// Scoping metadata stored next to every indexed snippet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Anything else the writer attached (message id, chunk number, timestamps)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ResultMetadata {
    pub fn for_message(conversation_id: &str, user_id: &str) -> Self {
        Self {
            conversation_id: Some(conversation_id.to_string()),
            user_id: Some(user_id.to_string()),
            ..Default::default()
        }
    }

    pub fn for_source(source: &str) -> Self {
        Self {
            source: Some(source.to_string()),
            ..Default::default()
        }
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

/// One hit returned by the vector index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub id: String,
    pub document: String,
    pub metadata: ResultMetadata,
    /// Lower is closer
    pub distance: f64,
}

/// A snippet to be written into the vector index
#[derive(Debug, Clone)]
pub struct VectorEntry {
    pub id: String,
    pub document: String,
    pub metadata: ResultMetadata,
    pub embedding: Vec<f32>,
}
