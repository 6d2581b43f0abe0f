//! LLM integration
//!
//! Provides traits and implementations for:
//! - Streaming and one-shot text generation
//! - Embedding generation
//! - Per-fragment read timeouts

mod client;
mod http_embedder;
mod timeout;
mod traits;

pub use client::{APIMetrics, MetricsSnapshot, OllamaClient};
pub use http_embedder::HttpEmbedder;
pub use timeout::with_read_timeout;
pub use traits::*;
