//! LLM trait definitions

use crate::error::Result;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Ordered text fragments produced by a streaming generation
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Text generation and embedding service
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate the full completion for a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate a completion as a stream of fragments
    async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream>;

    /// Generate an embedding for text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Check the service answers at all
    async fn ping(&self) -> Result<()> {
        self.generate("ping").await.map(|_| ())
    }

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Embedding generation trait
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for batch of texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Get model name
    fn model_name(&self) -> &str;
}
