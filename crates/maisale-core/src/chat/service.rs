//! Conversation service: persistence around the turn orchestrator
//!
//! Stores the user message, runs the turn, stores the reply exactly once and
//! then indexes both messages in the background. The user message is indexed
//! after the turn so retrieval never returns the question being answered.

use super::orchestrator::{ResponseKind, TurnOrchestrator};
use super::{Intent, Role};
use crate::config::{Config, Persona};
use crate::db::{ConversationInfo, Database, MessageRecord};
use crate::error::{MaiSaleError, Result};
use crate::llm::{Embedder, HttpEmbedder, LLMClient};
use crate::retrieval::{KnowledgeRetriever, ResultMetadata, VectorEntry};
use crate::store::{HistoryStore, VectorIndex};
use crate::stream::{event_channel, EventReceiver, SseWriter, StreamEvent};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::task::{JoinHandle, JoinSet};

const GREETING_KIND: &str = "greeting";

/// Result of a non-streaming turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub user_message: MessageRecord,
    pub assistant_message: MessageRecord,
    pub intent: Intent,
    pub kind: ResponseKind,
}

/// Health of one dependency
#[derive(Debug, Clone, Serialize)]
pub struct ComponentStatus {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ComponentStatus {
    fn from_result(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self {
                ok: true,
                detail: None,
            },
            Err(e) => Self {
                ok: false,
                detail: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessReport {
    pub database: ComponentStatus,
    pub model: ComponentStatus,
}

impl ReadinessReport {
    pub fn is_ready(&self) -> bool {
        self.database.ok && self.model.ok
    }
}

/// A streaming turn in flight.
///
/// `events` yields the open event, then the reply fragments. The reply is
/// persisted by the background task once generation ends or the receiver is
/// dropped.
pub struct StreamingTurn {
    pub user_message: MessageRecord,
    pub events: EventReceiver,
    handle: JoinHandle<Result<Option<MessageRecord>>>,
}

/// What a finished streaming turn left behind
#[derive(Debug, Clone)]
pub struct StreamSummary {
    pub events_written: usize,
    pub assistant_message: Option<MessageRecord>,
}

impl StreamingTurn {
    /// Wait for the turn to finish and return the stored reply, if any.
    ///
    /// Drops the event receiver first; call this after consuming `events`
    /// or to abandon the stream.
    pub async fn finish(self) -> Result<Option<MessageRecord>> {
        drop(self.events);
        join_turn(self.handle).await
    }

    /// Write the events to `writer` as wire bytes, then wait for persistence
    pub async fn write_to<W>(self, writer: W) -> Result<StreamSummary>
    where
        W: AsyncWrite + Unpin,
    {
        let pumped = SseWriter::new(writer).pump(self.events).await;
        let assistant_message = join_turn(self.handle).await?;
        Ok(StreamSummary {
            events_written: pumped?,
            assistant_message,
        })
    }
}

async fn join_turn(
    handle: JoinHandle<Result<Option<MessageRecord>>>,
) -> Result<Option<MessageRecord>> {
    handle
        .await
        .map_err(|e| MaiSaleError::ExternalError(format!("turn task failed: {}", e)))?
}

/// Entry point for conversations. Cheap to clone; clones share everything.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn HistoryStore>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LLMClient>,
    embedder: Arc<dyn Embedder>,
    orchestrator: Arc<TurnOrchestrator>,
    persona: Arc<Persona>,
    stream_capacity: usize,
    indexing: Arc<Mutex<JoinSet<()>>>,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LLMClient>,
        embedder: Arc<dyn Embedder>,
        config: &Config,
        persona: Persona,
    ) -> Self {
        let retriever = KnowledgeRetriever::new(
            Arc::clone(&embedder),
            Arc::clone(&index),
            config.chat.retrieval_top_k,
        );
        let orchestrator = TurnOrchestrator::new(
            Arc::clone(&llm),
            Some(retriever),
            persona.clone(),
            config.chat.clone(),
            Duration::from_secs(config.llm_service.timeout_secs),
        );

        Self {
            store,
            index,
            llm,
            embedder,
            orchestrator: Arc::new(orchestrator),
            persona: Arc::new(persona),
            stream_capacity: config.chat.stream_channel_capacity,
            indexing: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Service over one SQLite database, embedding through `llm`
    pub fn from_database(db: Arc<Database>, llm: Arc<dyn LLMClient>, config: &Config) -> Result<Self> {
        let persona = Persona::load(&config.chat.persona_path)?;
        let embedder = Arc::new(HttpEmbedder::new(
            Arc::clone(&llm),
            config.llm_service.embedding_model.clone(),
        ));
        Ok(Self::new(db.clone(), db, llm, embedder, config, persona))
    }

    /// Start a conversation; the persona greeting, if any, becomes its first message
    pub async fn create_conversation(
        &self,
        user_id: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<ConversationInfo> {
        let conversation = self.store.create_conversation(user_id, metadata).await?;
        tracing::info!(
            conversation_id = %conversation.id,
            user_id = %conversation.user_id,
            "Created conversation"
        );

        if let Some(greeting) = &self.persona.greeting {
            let marker = serde_json::json!({ "kind": GREETING_KIND });
            let record = self
                .store
                .append(&conversation.id, Role::Assistant, greeting, Some(marker))
                .await?;
            self.index_in_background(&record, &conversation.user_id);
        }
        Ok(conversation)
    }

    /// Messages of a conversation, oldest first
    pub async fn history(&self, conversation_id: &str) -> Result<Vec<MessageRecord>> {
        self.require_conversation(conversation_id).await?;
        self.store.load(conversation_id).await
    }

    /// Run a whole turn and return both stored messages
    pub async fn post_message(&self, conversation_id: &str, text: &str) -> Result<TurnReply> {
        let (conversation, user_message) = self.accept_message(conversation_id, text).await?;
        let history = self.store.load(conversation_id).await?;

        let mut state =
            self.orchestrator
                .prepare(&conversation.id, &conversation.user_id, &history, false);
        let outcome = self.orchestrator.run(&mut state).await;

        let assistant_message = self
            .persist_reply(&conversation, &outcome.response, outcome.kind)
            .await?
            .ok_or_else(|| MaiSaleError::Llm("turn produced no reply".to_string()))?;
        self.index_in_background(&user_message, &conversation.user_id);

        Ok(TurnReply {
            user_message,
            assistant_message,
            intent: outcome.intent,
            kind: outcome.kind,
        })
    }

    /// Start a streaming turn. The open event is queued before this returns.
    pub async fn stream_message(&self, conversation_id: &str, text: &str) -> Result<StreamingTurn> {
        let (conversation, user_message) = self.accept_message(conversation_id, text).await?;
        let history = self.store.load(conversation_id).await?;

        let (tx, rx) = event_channel(self.stream_capacity);
        let service = self.clone();
        let pending = user_message.clone();
        let handle = tokio::spawn(async move {
            let mut state = service.orchestrator.prepare(
                &conversation.id,
                &conversation.user_id,
                &history,
                true,
            );
            if tx.send(StreamEvent::Open).await.is_err() {
                tracing::warn!(
                    conversation_id = %conversation.id,
                    "Stream consumer gone before the turn started"
                );
                service.index_in_background(&pending, &conversation.user_id);
                return Ok(None);
            }

            let outcome = service.orchestrator.run_streaming(&mut state, &tx).await;
            drop(tx);
            let reply = service
                .persist_reply(&conversation, &outcome.response, outcome.kind)
                .await;
            service.index_in_background(&pending, &conversation.user_id);
            reply
        });

        Ok(StreamingTurn {
            user_message,
            events: rx,
            handle,
        })
    }

    /// Probe the database and the generation backend
    pub async fn readiness(&self) -> ReadinessReport {
        let database = ComponentStatus::from_result(self.store.ping().await);
        let model = ComponentStatus::from_result(self.llm.ping().await);
        ReadinessReport { database, model }
    }

    /// Wait until every queued indexing task has finished
    pub async fn wait_for_indexing(&self) {
        let mut tasks = {
            let mut guard = self.indexing.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };
        while tasks.join_next().await.is_some() {}
    }

    async fn require_conversation(&self, conversation_id: &str) -> Result<ConversationInfo> {
        self.store
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| MaiSaleError::ConversationNotFound(conversation_id.to_string()))
    }

    async fn accept_message(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<(ConversationInfo, MessageRecord)> {
        if text.trim().is_empty() {
            return Err(MaiSaleError::InvalidInput("message text is empty".to_string()));
        }
        let conversation = self.require_conversation(conversation_id).await?;
        let record = self
            .store
            .append(conversation_id, Role::User, text, None)
            .await?;
        Ok((conversation, record))
    }

    async fn persist_reply(
        &self,
        conversation: &ConversationInfo,
        response: &str,
        kind: ResponseKind,
    ) -> Result<Option<MessageRecord>> {
        if response.is_empty() {
            tracing::warn!(
                conversation_id = %conversation.id,
                "No reply text to persist"
            );
            return Ok(None);
        }
        let record = self
            .store
            .append(
                &conversation.id,
                Role::Assistant,
                response,
                kind.message_metadata(),
            )
            .await?;
        tracing::info!(
            conversation_id = %conversation.id,
            message_id = %record.id,
            kind = kind.as_str(),
            "Persisted reply"
        );
        self.index_in_background(&record, &conversation.user_id);
        Ok(Some(record))
    }

    fn index_in_background(&self, record: &MessageRecord, user_id: &str) {
        let entry_metadata = ResultMetadata::for_message(&record.conversation_id, user_id)
            .with_extra("message_id", record.id.clone())
            .with_extra("created_at", record.created_at.clone());
        let id = record.id.clone();
        let text = record.text.clone();
        let embedder = Arc::clone(&self.embedder);
        let index = Arc::clone(&self.index);

        let mut tasks = self.indexing.lock().unwrap_or_else(|e| e.into_inner());
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            let result = async {
                let embedding = embedder.embed(&text).await?;
                let entry = VectorEntry {
                    id: id.clone(),
                    document: text,
                    metadata: entry_metadata,
                    embedding,
                };
                index.upsert(vec![entry], embedder.model_name()).await
            }
            .await;

            match result {
                Ok(_) => tracing::debug!("Indexed message {}", id),
                Err(e) => tracing::warn!("Failed to index message {}: {}", id, e),
            }
        });
    }
}
