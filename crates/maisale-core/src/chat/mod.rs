//! Chat pipeline
//!
//! One user message becomes one turn: classify the intent, ask a clarify
//! question or fetch knowledge, then generate the reply in full or as a
//! fragment stream.

mod classifier;
mod language;
mod orchestrator;
mod prompt;
mod service;
mod state;
pub mod texts;

pub use classifier::{
    build_classifier_prompt, extract_json_object, heuristic_intent, parse_verdict,
    IntentClassifier, ModelDecision, ModelVerdict,
};
pub use language::{conversation_language, detect_language};
pub use orchestrator::{
    count_clarify_attempts, ResponseKind, TurnOrchestrator, TurnOutcome, TurnStage,
};
pub use prompt::{assemble_prompt, ASSISTANT_CUE};
pub use service::{
    ChatService, ComponentStatus, ReadinessReport, StreamSummary, StreamingTurn, TurnReply,
};
pub use state::{ChatMessage, Decision, Intent, Language, Role, TurnState};
