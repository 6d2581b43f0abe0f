//! Turn state and the values threaded through the pipeline

use crate::db::MessageRecord;
use crate::error::{MaiSaleError, Result};
use crate::retrieval::RetrievalResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Author of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = MaiSaleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(MaiSaleError::Parse(format!("unknown sender: {}", other))),
        }
    }
}

/// One role/content pair of conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&MessageRecord> for ChatMessage {
    fn from(record: &MessageRecord) -> Self {
        Self {
            role: record.sender,
            content: record.text.clone(),
        }
    }
}

/// Reply language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "vi")]
    Vi,
    #[serde(rename = "en")]
    En,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::Vi => "vi",
            Language::En => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Intent label. Labels outside the known set are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Intent {
    AssemblePc,
    Shopping,
    Warranty,
    #[default]
    Unknown,
    Other(String),
}

impl Intent {
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "assemble_pc" => Intent::AssemblePc,
            "shopping" => Intent::Shopping,
            "warranty" => Intent::Warranty,
            "" | "unknown" => Intent::Unknown,
            other => Intent::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Intent::AssemblePc => "assemble_pc",
            Intent::Shopping => "shopping",
            Intent::Warranty => "warranty",
            Intent::Unknown => "unknown",
            Intent::Other(label) => label,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Intent::Unknown)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Intent {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Outcome of intent classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub intent: Intent,
    pub confidence: f64,
    pub need_retrieval: bool,
    pub clarify_needed: bool,
    pub clarify_questions: Vec<String>,
    pub rationale: String,
    /// Reserved: nothing sets this yet
    pub should_farewell: bool,
}

/// Mutable context for one pass through the pipeline
#[derive(Debug, Clone)]
pub struct TurnState {
    pub conversation_id: String,
    pub user_id: String,
    pub history: Vec<ChatMessage>,
    pub metadata: HashMap<String, String>,
    pub retrieved_context: Option<Vec<RetrievalResult>>,
    pub response: Option<String>,
    pub stream: bool,
    pub intent: Intent,
    pub intent_confidence: f64,
    pub need_retrieval: bool,
    pub clarify_questions: Vec<String>,
    pub clarify_attempts: usize,
    pub language: Language,
}

impl TurnState {
    pub fn new(
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
        history: Vec<ChatMessage>,
        stream: bool,
    ) -> Self {
        let conversation_id = conversation_id.into();
        let user_id = user_id.into();
        let mut metadata = HashMap::new();
        metadata.insert("conversation_id".to_string(), conversation_id.clone());
        metadata.insert("user_id".to_string(), user_id.clone());

        Self {
            conversation_id,
            user_id,
            history,
            metadata,
            retrieved_context: None,
            response: None,
            stream,
            intent: Intent::Unknown,
            intent_confidence: 0.0,
            need_retrieval: false,
            clarify_questions: Vec::new(),
            clarify_attempts: 0,
            language: Language::default(),
        }
    }

    /// Content of the most recent user message
    pub fn latest_user_message(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// Up to `window` user messages preceding the latest one, oldest first
    pub fn preceding_user_messages(&self, window: usize) -> Vec<&str> {
        let users: Vec<&str> = self
            .history
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect();
        let before_latest = users.len().saturating_sub(1);
        let start = before_latest.saturating_sub(window);
        users[start..before_latest].to_vec()
    }

    /// Copy a classification result into the state
    pub fn apply_decision(&mut self, decision: &Decision) {
        self.intent = decision.intent.clone();
        self.intent_confidence = decision.confidence;
        self.need_retrieval = decision.need_retrieval;
        self.clarify_questions = decision.clarify_questions.clone();
    }
}
