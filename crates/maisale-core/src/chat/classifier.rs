//! Intent classification
//!
//! The model is asked for a JSON decision first. When that call fails, its
//! output cannot be parsed, or it comes back unknown/low-confidence, a fixed
//! bilingual keyword heuristic gets a say. Whatever remains ambiguous turns
//! into the canonical clarify question.

use super::language::conversation_language;
use super::texts;
use super::{Decision, Intent, Language, TurnState};
use crate::llm::LLMClient;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"[\p{L}\p{N}]+").unwrap();
}

const WARRANTY_KEYWORDS: &[&str] = &[
    "bảo hành", "bao hanh", "sửa chữa", "sua chua", "đổi trả", "doi tra", "hỏng", "bị lỗi",
    "warranty", "repair", "broken", "defective", "return", "serial", "rma",
];

const SHOPPING_KEYWORDS: &[&str] = &[
    "giá", "bao nhiêu", "bao nhieu", "mua", "đặt hàng", "dat hang", "còn hàng", "con hang",
    "khuyến mãi", "khuyen mai", "giao hàng", "giao hang", "trả góp", "tra gop", "price",
    "cost", "buy", "purchase", "order", "in stock", "discount", "shipping", "how much",
];

const ASSEMBLE_PC_KEYWORDS: &[&str] = &[
    "lắp ráp", "lap rap", "lắp máy", "lap may", "cấu hình", "cau hinh", "máy tính", "may tinh",
    "build", "assemble", "pc", "cpu", "gpu", "vga", "mainboard", "bo mạch", "ram", "ssd",
    "psu", "nguồn", "card đồ họa", "gaming", "tản nhiệt",
];

/// Raw decision as the model returns it; every field may be missing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelDecision {
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub need_retrieval: Option<bool>,
    #[serde(default)]
    pub clarify_needed: Option<bool>,
    #[serde(default)]
    pub clarify_questions: Option<Vec<String>>,
    #[serde(default)]
    pub rationale: Option<String>,
}

/// Result of asking the model
#[derive(Debug, Clone)]
pub enum ModelVerdict {
    Parsed(ModelDecision),
    /// The heuristic must decide; carries the reason
    FallbackRequested(String),
}

/// Classifies the latest user message of a turn
pub struct IntentClassifier {
    client: Arc<dyn LLMClient>,
    threshold: f64,
    history_window: usize,
    timeout: Duration,
}

impl IntentClassifier {
    pub fn new(
        client: Arc<dyn LLMClient>,
        threshold: f64,
        history_window: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            threshold,
            history_window,
            timeout,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Classify the turn. Never fails: every error degrades to the heuristic.
    pub async fn classify(&self, state: &TurnState) -> Decision {
        let language = conversation_language(&state.history);
        let latest = state.latest_user_message().unwrap_or_default();
        let recent = state.preceding_user_messages(self.history_window);

        let prompt = build_classifier_prompt(latest, &recent, language);
        let verdict = self.request_verdict(&prompt).await;
        let decision = self.decide(verdict, latest, language);

        tracing::info!(
            conversation_id = %state.conversation_id,
            intent = %decision.intent,
            confidence = decision.confidence,
            clarify = decision.clarify_needed,
            "Classified turn"
        );
        decision
    }

    /// Ask the model for a JSON decision, waiting at most the model timeout
    pub async fn request_verdict(&self, prompt: &str) -> ModelVerdict {
        match tokio::time::timeout(self.timeout, self.client.generate(prompt)).await {
            Ok(Ok(raw)) => parse_verdict(&raw),
            Ok(Err(e)) => {
                tracing::warn!("Classifier model call failed, using keyword heuristic: {}", e);
                ModelVerdict::FallbackRequested(format!("model call failed: {}", e))
            }
            Err(_) => {
                tracing::warn!(
                    "Classifier model call exceeded {}s, using keyword heuristic",
                    self.timeout.as_secs()
                );
                ModelVerdict::FallbackRequested("model call timed out".to_string())
            }
        }
    }

    /// Combine the model verdict with the keyword heuristic
    pub fn decide(&self, verdict: ModelVerdict, latest: &str, language: Language) -> Decision {
        let (mut intent, mut confidence, model_retrieval, mut clarify_needed, mut questions, mut rationale) =
            match verdict {
                ModelVerdict::Parsed(d) => (
                    Intent::parse(d.intent.as_deref().unwrap_or("unknown")),
                    d.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
                    d.need_retrieval,
                    d.clarify_needed.unwrap_or(false),
                    d.clarify_questions.unwrap_or_default(),
                    d.rationale.unwrap_or_default(),
                ),
                ModelVerdict::FallbackRequested(reason) => {
                    (Intent::Unknown, 0.0, None, false, Vec::new(), reason)
                }
            };
        let mut need_retrieval = model_retrieval;

        if intent.is_unknown() || confidence < self.threshold {
            if let Some(guess) = heuristic_intent(latest) {
                tracing::debug!("Keyword heuristic chose {}", guess);
                intent = guess;
                confidence = confidence.max(self.threshold);
                // The model's hints described a different reading of the message
                need_retrieval = None;
                clarify_needed = false;
                questions.clear();
                rationale = if rationale.is_empty() {
                    "keyword heuristic".to_string()
                } else {
                    format!("{}; keyword heuristic", rationale)
                };
            }
        }

        let need_retrieval = need_retrieval.unwrap_or(!intent.is_unknown());

        if intent.is_unknown() || confidence < self.threshold {
            clarify_needed = true;
            questions = vec![texts::clarify_question(language).to_string()];
        } else if clarify_needed && questions.iter().all(|q| q.trim().is_empty()) {
            questions = vec![texts::clarify_question(language).to_string()];
        }

        Decision {
            intent,
            confidence,
            need_retrieval,
            clarify_needed,
            clarify_questions: questions,
            rationale,
            should_farewell: false,
        }
    }
}

/// Prompt asking for the fixed JSON schema
pub fn build_classifier_prompt(latest: &str, recent: &[&str], language: Language) -> String {
    let mut prompt = String::from(
        "You classify messages sent to a computer store assistant.\n\
         Intents: assemble_pc (PC build advice), shopping (prices, stock, orders), \
         warranty (warranty, repairs, returns), unknown (anything else or unclear).\n\
         Reply with ONLY one JSON object using exactly these keys:\n\
         {\"intent\": string, \"confidence\": number between 0 and 1, \"need_retrieval\": boolean, \
         \"clarify_needed\": boolean, \"clarify_questions\": [string], \"rationale\": string}\n",
    );
    prompt.push_str(&format!("Conversation language: {}\n", language.code()));
    if !recent.is_empty() {
        prompt.push_str("Earlier user messages:\n");
        for message in recent {
            prompt.push_str(&format!("- {}\n", message));
        }
    }
    prompt.push_str(&format!("Latest user message: {}\nJSON:", latest));
    prompt
}

/// Parse model output, tolerating prose around the JSON object
pub fn parse_verdict(raw: &str) -> ModelVerdict {
    let Some(json) = extract_json_object(raw) else {
        return ModelVerdict::FallbackRequested("no JSON object in model output".to_string());
    };
    match serde_json::from_str::<ModelDecision>(json) {
        Ok(decision) => ModelVerdict::Parsed(decision),
        Err(e) => {
            tracing::warn!("Classifier returned malformed JSON: {}", e);
            ModelVerdict::FallbackRequested(format!("malformed JSON: {}", e))
        }
    }
}

/// First balanced `{...}` in `text`, skipping braces inside string literals
pub fn extract_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (i, &b) in bytes.iter().enumerate().skip(start) {
            if in_string {
                match b {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&text[start..=i]);
                    }
                }
                _ => {}
            }
        }
        search_from = start + 1;
    }
    None
}

/// Keyword vote over the message. `None` when nothing matches.
///
/// Ties resolve in the order warranty, shopping, assemble_pc.
pub fn heuristic_intent(text: &str) -> Option<Intent> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = WORD_RE.find_iter(&lower).map(|m| m.as_str()).collect();
    if words.is_empty() {
        return None;
    }
    let padded = format!(" {} ", words.join(" "));

    let count = |keywords: &[&str]| {
        keywords
            .iter()
            .filter(|kw| padded.contains(&format!(" {} ", kw)))
            .count()
    };

    let candidates = [
        (Intent::Warranty, count(WARRANTY_KEYWORDS)),
        (Intent::Shopping, count(SHOPPING_KEYWORDS)),
        (Intent::AssemblePc, count(ASSEMBLE_PC_KEYWORDS)),
    ];

    let mut best: Option<(Intent, usize)> = None;
    for (intent, hits) in candidates {
        if hits == 0 {
            continue;
        }
        match &best {
            Some((_, best_hits)) if *best_hits >= hits => {}
            _ => best = Some((intent, hits)),
        }
    }
    best.map(|(intent, _)| intent)
}
