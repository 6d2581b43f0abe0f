//! Configuration management

pub mod persona;

use crate::error::{MaiSaleError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use persona::Persona;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// LLM service configuration
    #[serde(default)]
    pub llm_service: LLMServiceConfig,

    /// Turn pipeline tuning
    #[serde(default)]
    pub chat: ChatConfig,

    /// Knowledge indexing configuration
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Shared secrets accepted by the front ends
    #[serde(default = "default_api_keys")]
    pub api_keys: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_service: LLMServiceConfig::default(),
            chat: ChatConfig::default(),
            knowledge: KnowledgeConfig::default(),
            api_keys: default_api_keys(),
        }
    }
}

/// LLM service configuration (Ollama-compatible HTTP API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// Base URL of the generation service
    pub url: String,

    /// Model name for generation and classification
    #[serde(default = "default_generate_model")]
    pub model: String,

    /// Base URL for embeddings service (can be different from LLM URL)
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// API key (optional, for authenticated gateways in front of the model)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Upper bound on a single network read, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl LLMServiceConfig {
    /// Get the embeddings URL (falls back to main URL if not specified)
    pub fn embeddings_url(&self) -> &str {
        self.embedding_url.as_deref().unwrap_or(&self.url)
    }
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("MAISALE_LLM_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            model: default_generate_model(),
            embedding_url: std::env::var("MAISALE_EMBEDDING_URL").ok(),
            embedding_model: default_embedding_model(),
            api_key: std::env::var("MAISALE_LLM_API_KEY").ok(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_generate_model() -> String {
    std::env::var("MAISALE_LLM_MODEL").unwrap_or_else(|_| "gpt-oss".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("MAISALE_EMBEDDING_MODEL").unwrap_or_else(|_| "bge-m3".to_string())
}

fn default_timeout() -> u64 {
    std::env::var("MAISALE_LLM_TIMEOUT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(60)
}

fn default_api_keys() -> Vec<String> {
    std::env::var("MAISALE_API_KEYS")
        .unwrap_or_else(|_| "default-dev-key".to_string())
        .split(',')
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Turn pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Persona file; a missing file means no persona
    #[serde(default = "default_persona_path")]
    pub persona_path: PathBuf,

    /// Persona text is cut to this many characters in the prompt
    #[serde(default = "default_persona_max_chars")]
    pub persona_max_chars: usize,

    /// Below this confidence the classifier asks a clarify question
    #[serde(default = "default_confidence_threshold")]
    pub intent_confidence_threshold: f64,

    /// Clarify questions asked per conversation before answering anyway
    #[serde(default = "default_clarify_max_attempts")]
    pub clarify_max_attempts: usize,

    /// Number of knowledge results fetched per turn
    #[serde(default = "default_top_k")]
    pub retrieval_top_k: usize,

    /// Preceding user messages shown to the classifier
    #[serde(default = "default_history_window")]
    pub classifier_history_window: usize,

    /// Capacity of the generation -> transport channel
    #[serde(default = "default_stream_capacity")]
    pub stream_channel_capacity: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            persona_path: default_persona_path(),
            persona_max_chars: default_persona_max_chars(),
            intent_confidence_threshold: default_confidence_threshold(),
            clarify_max_attempts: default_clarify_max_attempts(),
            retrieval_top_k: default_top_k(),
            classifier_history_window: default_history_window(),
            stream_channel_capacity: default_stream_capacity(),
        }
    }
}

fn default_persona_path() -> PathBuf {
    std::env::var("MAISALE_PERSONA_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./prompts/system_persona_vi.md"))
}

fn default_persona_max_chars() -> usize {
    4000
}

fn default_confidence_threshold() -> f64 {
    std::env::var("MAISALE_INTENT_CONFIDENCE_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.5)
}

fn default_clarify_max_attempts() -> usize {
    3
}

fn default_top_k() -> usize {
    3
}

fn default_history_window() -> usize {
    3
}

fn default_stream_capacity() -> usize {
    32
}

/// Knowledge folder indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Words per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Words shared between consecutive chunks
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    400
}

fn default_overlap() -> usize {
    50
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load config from an explicit path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.chat.intent_confidence_threshold) {
            return Err(MaiSaleError::Config(format!(
                "intent_confidence_threshold must be within 0.0-1.0, got {}",
                self.chat.intent_confidence_threshold
            )));
        }
        if self.chat.stream_channel_capacity == 0 {
            return Err(MaiSaleError::Config(
                "stream_channel_capacity must be at least 1".to_string(),
            ));
        }
        if self.knowledge.overlap >= self.knowledge.chunk_size {
            return Err(MaiSaleError::Config(format!(
                "knowledge overlap ({}) must be smaller than chunk_size ({})",
                self.knowledge.overlap, self.knowledge.chunk_size
            )));
        }
        Ok(())
    }

    /// Check a caller-supplied shared secret
    pub fn authorize(&self, api_key: Option<&str>) -> Result<()> {
        match api_key {
            Some(key) if self.api_keys.iter().any(|k| k == key) => Ok(()),
            _ => {
                tracing::warn!("Rejected request with invalid or missing API key");
                Err(MaiSaleError::Unauthorized)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize() {
        let config = Config {
            api_keys: vec!["k1".to_string(), "k2".to_string()],
            ..Config::default()
        };
        assert!(config.authorize(Some("k2")).is_ok());
        assert!(matches!(
            config.authorize(Some("nope")),
            Err(MaiSaleError::Unauthorized)
        ));
        assert!(config.authorize(None).is_err());
    }

    #[test]
    fn test_yaml_defaults_fill_missing_sections() {
        let yaml = "llm_service:\n  url: http://ollama:11434\napi_keys: [secret]\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.llm_service.url, "http://ollama:11434");
        assert_eq!(config.chat.clarify_max_attempts, 3);
        assert_eq!(config.chat.retrieval_top_k, 3);
        assert_eq!(config.knowledge.chunk_size, 400);
        assert_eq!(config.api_keys, vec!["secret".to_string()]);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = Config::default();
        config.chat.intent_confidence_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_embeddings_url_fallback() {
        let mut llm = LLMServiceConfig::default();
        llm.url = "http://a:1".to_string();
        llm.embedding_url = None;
        assert_eq!(llm.embeddings_url(), "http://a:1");
        llm.embedding_url = Some("http://b:2".to_string());
        assert_eq!(llm.embeddings_url(), "http://b:2");
    }
}
