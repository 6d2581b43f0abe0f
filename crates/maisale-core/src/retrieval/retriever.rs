//! Embedding-based knowledge lookup

use super::{rerank, MetadataFilter, RetrievalResult};
use crate::error::{MaiSaleError, Result};
use crate::llm::Embedder;
use crate::store::VectorIndex;
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_TOP_K: usize = 3;

/// Embeds a query and asks the index for its nearest snippets
pub struct KnowledgeRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl KnowledgeRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, top_k: usize) -> Self {
        Self {
            embedder,
            index,
            top_k,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Nearest snippets for `query`, scoped by `conversation_id`/`user_id`
    /// entries of `scope` when present. Errors are returned, not swallowed.
    pub async fn retrieve(
        &self,
        query: &str,
        scope: &HashMap<String, String>,
    ) -> Result<Vec<RetrievalResult>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| MaiSaleError::Retrieval(format!("embedding failed: {}", e)))?;

        let filter = MetadataFilter::from_scope(scope);
        let results = self
            .index
            .query(&embedding, self.top_k, filter.as_ref())
            .await?;

        tracing::debug!("Retrieved {} results (top_k={})", results.len(), self.top_k);
        Ok(results)
    }

    /// [`retrieve`](Self::retrieve) followed by the context-boost rerank
    pub async fn retrieve_reranked(
        &self,
        query: &str,
        scope: &HashMap<String, String>,
    ) -> Result<Vec<RetrievalResult>> {
        let results = self.retrieve(query, scope).await?;
        Ok(rerank(results, scope))
    }
}
