//! Mai-Sale Core Library
//!
//! Core functionality for the Mai-Sale sales chat backend.
//!
//! # Features
//! - Turn pipeline: intent classification, clarify loop, retrieval, generation
//! - Keyword fallback when the model cannot classify a message
//! - Context-boosted reranking of knowledge snippets
//! - Incremental reply delivery as `data:` events with client-side reassembly
//! - SQLite storage for conversations, messages and embeddings

pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod retrieval;
pub mod store;
pub mod stream;

pub use chat::{
    ChatMessage, ChatService, Decision, Intent, IntentClassifier, Language, ReadinessReport,
    ResponseKind, Role, StreamingTurn, TurnOrchestrator, TurnOutcome, TurnReply, TurnState,
};
pub use config::{ChatConfig, Config, KnowledgeConfig, LLMServiceConfig, Persona};
pub use db::{ConversationInfo, Database, MessageRecord};
pub use error::{Error, MaiSaleError, Result};
pub use knowledge::{IndexReport, KnowledgeIndexer};
pub use llm::{Embedder, FragmentStream, HttpEmbedder, LLMClient, MetricsSnapshot, OllamaClient};
pub use retrieval::{KnowledgeRetriever, MetadataFilter, ResultMetadata, RetrievalResult};
pub use store::{HistoryStore, VectorIndex};
pub use stream::{reassemble_text, smart_append, SseReassembler, StreamEvent};

/// Default cache directory name
pub const CACHE_DIR_NAME: &str = "maisale";

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "maisale";
