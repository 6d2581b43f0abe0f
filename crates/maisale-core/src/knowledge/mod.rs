//! Knowledge base indexing
//!
//! Splits documents of a folder into word windows and stores their
//! embeddings next to the conversation snippets.

mod chunker;
mod indexer;

pub use chunker::{chunk_words, Chunk};
pub use indexer::{IndexReport, KnowledgeIndexer};
