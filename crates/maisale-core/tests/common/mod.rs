//! Scripted collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use futures::{stream, StreamExt};
use maisale_core::llm::{Embedder, FragmentStream, LLMClient};
use maisale_core::{ChatService, Config, Database, MaiSaleError, Persona, Result};
use std::sync::{Arc, Mutex};

const CLASSIFIER_PROMPT_PREFIX: &str = "You classify messages";

/// How `generate_stream` behaves
#[derive(Clone)]
pub enum StreamScript {
    Fragments(Vec<String>),
    /// Yields the fragments, then never produces anything again
    HangAfter(Vec<String>),
    /// Yields the fragments, then a transport error
    FailAfter(Vec<String>),
}

/// Model double: canned classifier reply, canned answers, recorded prompts
pub struct ScriptedLlm {
    classifier_reply: Option<String>,
    answer: Option<String>,
    stream: StreamScript,
    stalled_classifier: bool,
    stalled_answer: bool,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    /// Classifier call fails, answers are "ok"
    pub fn offline_classifier() -> Self {
        Self {
            classifier_reply: None,
            answer: Some("ok".to_string()),
            stream: StreamScript::Fragments(vec!["ok".to_string()]),
            stalled_classifier: false,
            stalled_answer: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_classifier_reply(mut self, reply: &str) -> Self {
        self.classifier_reply = Some(reply.to_string());
        self
    }

    pub fn with_answer(mut self, answer: Option<&str>) -> Self {
        self.answer = answer.map(str::to_string);
        self
    }

    /// Classifier calls never return
    pub fn with_stalled_classifier(mut self) -> Self {
        self.stalled_classifier = true;
        self
    }

    /// Non-streaming answer calls never return
    pub fn with_stalled_answer(mut self) -> Self {
        self.stalled_answer = true;
        self
    }

    pub fn with_stream(mut self, script: StreamScript) -> Self {
        self.stream = script;
        self
    }

    /// Generation prompts seen so far, classifier prompts excluded
    pub fn generation_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| !p.starts_with(CLASSIFIER_PROMPT_PREFIX))
            .cloned()
            .collect()
    }

    fn record(&self, prompt: &str) {
        self.prompts.lock().unwrap().push(prompt.to_string());
    }
}

#[async_trait]
impl LLMClient for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.record(prompt);
        let classifying = prompt.starts_with(CLASSIFIER_PROMPT_PREFIX);
        let stalled = if classifying {
            self.stalled_classifier
        } else {
            self.stalled_answer
        };
        if stalled {
            return futures::future::pending().await;
        }
        let reply = if classifying {
            &self.classifier_reply
        } else {
            &self.answer
        };
        reply
            .clone()
            .ok_or_else(|| MaiSaleError::Llm("connection refused".to_string()))
    }

    async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream> {
        self.record(prompt);
        let script = self.stream.clone();
        Ok(match script {
            StreamScript::Fragments(fragments) => {
                Box::pin(stream::iter(fragments.into_iter().map(Ok)))
            }
            StreamScript::HangAfter(fragments) => Box::pin(
                stream::iter(fragments.into_iter().map(Ok)).chain(stream::pending()),
            ),
            StreamScript::FailAfter(fragments) => Box::pin(
                stream::iter(fragments.into_iter().map(Ok)).chain(stream::once(async {
                    Err(MaiSaleError::Llm("connection reset".to_string()))
                })),
            ),
        })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        KeywordEmbedder.embed(text).await
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Two-keyword embedding: (mentions a GPU, mentions a price)
pub struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let text = text.to_lowercase();
        let gpu = ["gpu", "rtx", "card"].iter().any(|k| text.contains(k));
        let price = ["giá", "price", "bao nhiêu"].iter().any(|k| text.contains(k));
        Ok(vec![
            if gpu { 1.0 } else { 0.0 },
            if price { 1.0 } else { 0.0 },
            0.1,
        ])
    }

    fn model_name(&self) -> &str {
        "keyword"
    }
}

pub fn database() -> Arc<Database> {
    let db = Database::open_in_memory().unwrap();
    db.initialize().unwrap();
    Arc::new(db)
}

pub fn test_config(timeout_secs: u64) -> Config {
    let mut config = Config::default();
    config.llm_service.timeout_secs = timeout_secs;
    config
}

pub fn service(db: &Arc<Database>, llm: &Arc<ScriptedLlm>, persona: Persona) -> ChatService {
    ChatService::new(
        db.clone(),
        db.clone(),
        llm.clone(),
        Arc::new(KeywordEmbedder),
        &test_config(5),
        persona,
    )
}
