//! Turn orchestration: classify, then clarify or retrieve, then generate
//!
//! `START -> CLASSIFYING -> {CLARIFYING | FAREWELL | RETRIEVING} -> GENERATING -> DONE`,
//! with `ERROR` reachable from classification and generation. Every path
//! ends with a non-empty reply unless the stream consumer went away first.

use super::classifier::IntentClassifier;
use super::language::conversation_language;
use super::prompt::assemble_prompt;
use super::texts;
use super::{ChatMessage, Intent, Language, Role, TurnState};
use crate::config::{ChatConfig, Persona};
use crate::db::MessageRecord;
use crate::error::MaiSaleError;
use crate::llm::{with_read_timeout, LLMClient};
use crate::retrieval::KnowledgeRetriever;
use crate::stream::{EventSender, StreamEvent};
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Pipeline stage, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    Start,
    Classifying,
    Clarifying,
    Farewell,
    Retrieving,
    Generating,
    Done,
    Error,
}

impl TurnStage {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnStage::Start => "start",
            TurnStage::Classifying => "classifying",
            TurnStage::Clarifying => "clarifying",
            TurnStage::Farewell => "farewell",
            TurnStage::Retrieving => "retrieving",
            TurnStage::Generating => "generating",
            TurnStage::Done => "done",
            TurnStage::Error => "error",
        }
    }
}

/// What the reply text is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Answer,
    Clarify,
    Farewell,
    Apology,
    Timeout,
}

impl ResponseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseKind::Answer => "answer",
            ResponseKind::Clarify => "clarify",
            ResponseKind::Farewell => "farewell",
            ResponseKind::Apology => "apology",
            ResponseKind::Timeout => "timeout",
        }
    }

    /// Metadata stored with the assistant message. Plain answers carry none.
    pub fn message_metadata(self) -> Option<serde_json::Value> {
        match self {
            ResponseKind::Answer => None,
            kind => {
                let mut map = serde_json::Map::new();
                map.insert(
                    texts::CLARIFY_MARKER_KEY.to_string(),
                    serde_json::Value::String(kind.as_str().to_string()),
                );
                Some(serde_json::Value::Object(map))
            }
        }
    }
}

/// Result of one turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    /// Full reply; in streaming mode the concatenation of every emitted fragment
    pub response: String,
    pub kind: ResponseKind,
    pub intent: Intent,
    pub language: Language,
    pub fragments: usize,
    /// The stream consumer stopped listening before the turn finished
    pub disconnected: bool,
}

enum Route {
    Reply(String, ResponseKind),
    Generate(String),
}

/// Runs turns. Holds no per-turn state; one instance serves concurrent turns.
pub struct TurnOrchestrator {
    classifier: IntentClassifier,
    retriever: Option<KnowledgeRetriever>,
    llm: Arc<dyn LLMClient>,
    persona: Persona,
    config: ChatConfig,
    read_timeout: Duration,
}

impl TurnOrchestrator {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        retriever: Option<KnowledgeRetriever>,
        persona: Persona,
        config: ChatConfig,
        read_timeout: Duration,
    ) -> Self {
        let classifier = IntentClassifier::new(
            Arc::clone(&llm),
            config.intent_confidence_threshold,
            config.classifier_history_window,
            read_timeout,
        );
        Self {
            classifier,
            retriever,
            llm,
            persona,
            config,
            read_timeout,
        }
    }

    /// Fresh turn state from persisted history
    pub fn prepare(
        &self,
        conversation_id: &str,
        user_id: &str,
        history: &[MessageRecord],
        stream: bool,
    ) -> TurnState {
        let messages: Vec<ChatMessage> = history.iter().map(ChatMessage::from).collect();
        let mut state = TurnState::new(conversation_id, user_id, messages, stream);
        state.language = conversation_language(&state.history);
        state.clarify_attempts = count_clarify_attempts(history, state.language);
        self.enter(&state, TurnStage::Start);
        state
    }

    /// Run a turn to completion and return the whole reply
    pub async fn run(&self, state: &mut TurnState) -> TurnOutcome {
        let language = state.language;
        let (response, kind) = match self.route(state).await {
            Route::Reply(text, kind) => (text, kind),
            Route::Generate(prompt) => {
                match tokio::time::timeout(self.read_timeout, self.llm.generate(&prompt)).await {
                    Ok(Ok(text)) if !text.trim().is_empty() => (text, ResponseKind::Answer),
                    Ok(Ok(_)) => {
                        self.fail(state, "model returned an empty reply");
                        (texts::apology(language).to_string(), ResponseKind::Apology)
                    }
                    Ok(Err(e)) if e.is_timeout() => {
                        self.fail(state, &e.to_string());
                        (texts::timeout_notice(language).to_string(), ResponseKind::Timeout)
                    }
                    Ok(Err(e)) => {
                        self.fail(state, &e.to_string());
                        (texts::apology(language).to_string(), ResponseKind::Apology)
                    }
                    Err(_) => {
                        self.fail(state, "generation timed out");
                        (texts::timeout_notice(language).to_string(), ResponseKind::Timeout)
                    }
                }
            }
        };

        state.response = Some(response.clone());
        self.enter(state, TurnStage::Done);
        TurnOutcome {
            response,
            kind,
            intent: state.intent.clone(),
            language,
            fragments: 1,
            disconnected: false,
        }
    }

    /// Run a turn, sending each fragment to `events` as soon as it exists.
    ///
    /// Returns once generation ends or the receiver is dropped; the outcome
    /// holds exactly the text that was delivered.
    pub async fn run_streaming(&self, state: &mut TurnState, events: &EventSender) -> TurnOutcome {
        let language = state.language;
        let mut emitter = Emitter::new(events);

        let kind = match self.route(state).await {
            Route::Reply(text, kind) => {
                emitter.chunk(text).await;
                kind
            }
            Route::Generate(prompt) => self.stream_generation(state, &prompt, &mut emitter).await,
        };

        let response = emitter.accumulated;
        if emitter.disconnected {
            tracing::warn!(
                conversation_id = %state.conversation_id,
                "Stream consumer disconnected after {} fragments",
                emitter.fragments
            );
        }

        state.response = Some(response.clone());
        self.enter(state, TurnStage::Done);
        TurnOutcome {
            response,
            kind,
            intent: state.intent.clone(),
            language,
            fragments: emitter.fragments,
            disconnected: emitter.disconnected,
        }
    }

    async fn stream_generation(
        &self,
        state: &TurnState,
        prompt: &str,
        emitter: &mut Emitter<'_>,
    ) -> ResponseKind {
        let language = state.language;

        let opened = tokio::time::timeout(self.read_timeout, self.llm.generate_stream(prompt)).await;
        let mut fragments = match opened {
            Ok(Ok(stream)) => with_read_timeout(stream, self.read_timeout),
            Ok(Err(e)) => return self.stream_failure(state, e, emitter).await,
            Err(_) => {
                let e = MaiSaleError::Timeout(self.read_timeout.as_secs());
                return self.stream_failure(state, e, emitter).await;
            }
        };

        while let Some(item) = fragments.next().await {
            match item {
                Ok(fragment) if fragment.is_empty() => continue,
                Ok(fragment) => {
                    tracing::debug!(
                        conversation_id = %state.conversation_id,
                        "Fragment {}: {:?}",
                        emitter.fragments,
                        fragment
                    );
                    if !emitter.chunk(fragment).await {
                        return ResponseKind::Answer;
                    }
                }
                Err(e) => return self.stream_failure(state, e, emitter).await,
            }
        }

        if emitter.accumulated.trim().is_empty() {
            self.fail(state, "model stream ended without text");
            emitter.error(texts::apology(language).to_string()).await;
            return ResponseKind::Apology;
        }
        ResponseKind::Answer
    }

    async fn stream_failure(
        &self,
        state: &TurnState,
        error: MaiSaleError,
        emitter: &mut Emitter<'_>,
    ) -> ResponseKind {
        self.fail(state, &error.to_string());
        let (text, kind) = if error.is_timeout() {
            (texts::timeout_notice(state.language), ResponseKind::Timeout)
        } else {
            (texts::apology(state.language), ResponseKind::Apology)
        };
        emitter.error(text.to_string()).await;
        kind
    }

    /// Classification and the branch it selects. Retrieval happens here.
    async fn route(&self, state: &mut TurnState) -> Route {
        self.enter(state, TurnStage::Classifying);
        let decision = self.classifier.classify(state).await;
        state.apply_decision(&decision);

        if decision.should_farewell {
            self.enter(state, TurnStage::Farewell);
            return Route::Reply(
                texts::farewell(state.language).to_string(),
                ResponseKind::Farewell,
            );
        }

        if decision.clarify_needed {
            if state.clarify_attempts < self.config.clarify_max_attempts {
                self.enter(state, TurnStage::Clarifying);
                let question = decision
                    .clarify_questions
                    .iter()
                    .find(|q| !q.trim().is_empty())
                    .cloned()
                    .unwrap_or_else(|| texts::clarify_question(state.language).to_string());
                return Route::Reply(question, ResponseKind::Clarify);
            }
            tracing::info!(
                conversation_id = %state.conversation_id,
                attempts = state.clarify_attempts,
                intent = %state.intent,
                "Clarify limit reached, answering anyway"
            );
        }

        if state.need_retrieval {
            self.retrieve(state).await;
        }

        self.enter(state, TurnStage::Generating);
        let persona = self.persona.truncated(self.config.persona_max_chars);
        Route::Generate(assemble_prompt(state, persona))
    }

    async fn retrieve(&self, state: &mut TurnState) {
        let Some(retriever) = &self.retriever else {
            state.retrieved_context = Some(Vec::new());
            return;
        };
        self.enter(state, TurnStage::Retrieving);

        let query = state.latest_user_message().unwrap_or_default().to_string();
        match retriever.retrieve_reranked(&query, &state.metadata).await {
            Ok(results) => {
                tracing::info!(
                    conversation_id = %state.conversation_id,
                    "Retrieved {} context items",
                    results.len()
                );
                state.retrieved_context = Some(results);
            }
            Err(e) => {
                tracing::warn!(
                    conversation_id = %state.conversation_id,
                    "Retrieval failed, continuing without context: {}",
                    e
                );
                state.retrieved_context = Some(Vec::new());
            }
        }
    }

    fn enter(&self, state: &TurnState, stage: TurnStage) {
        tracing::info!(
            conversation_id = %state.conversation_id,
            stage = stage.as_str(),
            "Turn stage"
        );
    }

    fn fail(&self, state: &TurnState, reason: &str) {
        tracing::error!(
            conversation_id = %state.conversation_id,
            stage = TurnStage::Error.as_str(),
            "Generation failed: {}",
            reason
        );
    }
}

/// Prior clarify replies: assistant messages carrying the clarify marker or
/// equal to the canonical clarify question
pub fn count_clarify_attempts(history: &[MessageRecord], language: Language) -> usize {
    let canonical = texts::clarify_question(language);
    history
        .iter()
        .filter(|m| m.sender == Role::Assistant)
        .filter(|m| {
            m.metadata_str(texts::CLARIFY_MARKER_KEY) == Some(texts::CLARIFY_MARKER_VALUE)
                || m.text == canonical
        })
        .count()
}

/// Sends fragments and keeps exactly what was delivered
struct Emitter<'a> {
    events: &'a EventSender,
    accumulated: String,
    fragments: usize,
    disconnected: bool,
}

impl<'a> Emitter<'a> {
    fn new(events: &'a EventSender) -> Self {
        Self {
            events,
            accumulated: String::new(),
            fragments: 0,
            disconnected: false,
        }
    }

    async fn chunk(&mut self, text: String) -> bool {
        self.send(StreamEvent::Chunk(text)).await
    }

    async fn error(&mut self, text: String) -> bool {
        self.send(StreamEvent::Error(text)).await
    }

    async fn send(&mut self, event: StreamEvent) -> bool {
        if self.disconnected {
            return false;
        }
        let text = event.text().unwrap_or_default().to_string();
        if self.events.send(event).await.is_err() {
            self.disconnected = true;
            return false;
        }
        self.accumulated.push_str(&text);
        self.fragments += 1;
        true
    }
}
