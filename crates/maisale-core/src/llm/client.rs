//! HTTP client for Ollama-compatible model services

use super::{FragmentStream, LLMClient};
use crate::config::LLMServiceConfig;
use crate::error::{MaiSaleError, Result};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{atomic::AtomicU64, Arc};
use std::time::{Duration, Instant};

/// API metrics for monitoring
#[derive(Debug, Default)]
pub struct APIMetrics {
    pub total_requests: AtomicU64,
    pub total_errors: AtomicU64,
    pub streamed_fragments: AtomicU64,
    pub total_latency_ms: AtomicU64,
}

/// Snapshot of API metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    pub streamed_fragments: u64,
    pub avg_latency_ms: f64,
}

/// Client for the `/api/generate` and `/api/embeddings` endpoints
pub struct OllamaClient {
    http_client: reqwest::Client,
    config: LLMServiceConfig,
    metrics: Arc<APIMetrics>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// One line of a streamed generate response
#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

impl OllamaClient {
    /// Create new client from configuration
    pub fn new(config: LLMServiceConfig) -> Result<Self> {
        // Only connecting is bounded here; reads are bounded per fragment by the caller
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(MaiSaleError::Http)?;

        Ok(Self {
            http_client,
            config,
            metrics: Arc::new(APIMetrics::default()),
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(LLMServiceConfig::default())
    }

    pub fn config(&self) -> &LLMServiceConfig {
        &self.config
    }

    /// Get current API metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        use std::sync::atomic::Ordering;

        let total = self.metrics.total_requests.load(Ordering::Relaxed);
        MetricsSnapshot {
            total_requests: total,
            total_errors: self.metrics.total_errors.load(Ordering::Relaxed),
            streamed_fragments: self.metrics.streamed_fragments.load(Ordering::Relaxed),
            avg_latency_ms: if total > 0 {
                self.metrics.total_latency_ms.load(Ordering::Relaxed) as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self.http_client.post(url);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }
        req
    }

    async fn send_checked(
        &self,
        req: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<reqwest::Response> {
        use std::sync::atomic::Ordering;

        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        let response = req.send().await.map_err(|e| {
            self.metrics.total_errors.fetch_add(1, Ordering::Relaxed);
            if e.is_timeout() {
                MaiSaleError::Timeout(self.config.timeout_secs)
            } else {
                MaiSaleError::Http(e)
            }
        })?;

        if !response.status().is_success() {
            self.metrics.total_errors.fetch_add(1, Ordering::Relaxed);
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MaiSaleError::ExternalError(format!(
                "{} service error (HTTP {}): {}",
                what, status, body
            )));
        }

        Ok(response)
    }

    fn record_latency(&self, start: Instant) {
        use std::sync::atomic::Ordering;
        let elapsed = start.elapsed().as_millis() as u64;
        self.metrics
            .total_latency_ms
            .fetch_add(elapsed, Ordering::Relaxed);
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let url = format!("{}/api/generate", self.config.url);
        let req = self
            .request(&url)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(&GenerateRequest {
                model: &self.config.model,
                prompt,
                stream: false,
            });

        tracing::debug!("Calling generate with model {}", self.config.model);
        let response = self.send_checked(req, "Generation").await?;
        let body: GenerateResponse = response.json().await?;
        self.record_latency(start);

        body.response.ok_or_else(|| {
            MaiSaleError::Llm("Invalid response: missing 'response' field".to_string())
        })
    }

    async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream> {
        let start = Instant::now();
        let url = format!("{}/api/generate", self.config.url);
        let req = self.request(&url).json(&GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: true,
        });

        tracing::debug!("Opening generate stream with model {}", self.config.model);
        let response = self.send_checked(req, "Generation").await?;
        self.record_latency(start);

        let metrics = Arc::clone(&self.metrics);
        let fragments = ndjson_fragments(response.bytes_stream()).inspect(move |item| {
            if item.is_ok() {
                metrics
                    .streamed_fragments
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
        });
        Ok(Box::pin(fragments))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let url = format!("{}/api/embeddings", self.config.embeddings_url());
        let req = self
            .request(&url)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(&EmbeddingRequest {
                model: &self.config.embedding_model,
                prompt: text,
            });

        let response = self.send_checked(req, "Embedding").await?;
        let body: EmbeddingResponse = response.json().await?;
        self.record_latency(start);

        if body.embedding.is_empty() {
            return Err(MaiSaleError::Llm("No embedding returned".to_string()));
        }
        Ok(body.embedding)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

struct NdjsonState<S> {
    body: Pin<Box<S>>,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    finished: bool,
}

impl<S> NdjsonState<S> {
    /// Parse every complete line in the buffer. Returns true once `done` is seen.
    fn drain_lines(&mut self) -> bool {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if self.parse_line(&line) {
                return true;
            }
        }
        false
    }

    fn parse_line(&mut self, line: &[u8]) -> bool {
        let trimmed = trim_ascii(line);
        if trimmed.is_empty() {
            return false;
        }
        match serde_json::from_slice::<GenerateChunk>(trimmed) {
            Ok(chunk) => {
                if !chunk.response.is_empty() {
                    self.pending.push_back(chunk.response);
                }
                chunk.done
            }
            Err(e) => {
                tracing::warn!("Skipping malformed stream line: {}", e);
                false
            }
        }
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |p| p + 1);
    &bytes[start..end]
}

/// Turn a newline-delimited JSON byte stream into response fragments.
///
/// Lines are split on raw bytes, so multi-byte characters cut across network
/// chunks are reassembled before decoding.
pub(crate) fn ndjson_fragments<S, B, E>(body: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<MaiSaleError> + Send + 'static,
{
    let state = NdjsonState {
        body: Box::pin(body),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(fragment) = state.pending.pop_front() {
                return Some((Ok(fragment), state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => {
                    state.buffer.extend_from_slice(bytes.as_ref());
                    if state.drain_lines() {
                        state.finished = true;
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e.into()), state));
                }
                None => {
                    let rest = std::mem::take(&mut state.buffer);
                    state.parse_line(&rest);
                    state.finished = true;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(chunks: Vec<&[u8]>) -> Vec<String> {
        let body = futures::stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<Vec<u8>, MaiSaleError>(c.to_vec()))
                .collect::<Vec<_>>(),
        );
        ndjson_fragments(body)
            .map(|r| r.unwrap())
            .collect::<Vec<_>>()
            .await
    }

    #[tokio::test]
    async fn test_ndjson_lines_become_fragments() {
        let out = collect(vec![
            &b"{\"response\":\"Hello\",\"done\":false}\n{\"response\":\" world\",\"done\":false}\n"[..],
            &b"{\"response\":\"\",\"done\":true}\n"[..],
        ])
        .await;
        assert_eq!(out, vec!["Hello", " world"]);
    }

    #[tokio::test]
    async fn test_line_split_across_chunks() {
        let line = "{\"response\":\"giá\",\"done\":false}\n".as_bytes();
        // Split inside the two-byte 'á'
        let cut = line.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let out = collect(vec![&line[..cut], &line[cut..]]).await;
        assert_eq!(out, vec!["giá"]);
    }

    #[tokio::test]
    async fn test_stops_after_done() {
        let out = collect(vec![
            &b"{\"response\":\"a\",\"done\":true}\n{\"response\":\"ignored\"}\n"[..],
        ])
        .await;
        assert_eq!(out, vec!["a"]);
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline() {
        let out = collect(vec![&b"{\"response\":\"x\"}\ngarbage\n{\"response\":\"y\"}"[..]]).await;
        assert_eq!(out, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_body_error_is_forwarded() {
        let body = futures::stream::iter(vec![
            Ok(b"{\"response\":\"a\"}\n".to_vec()),
            Err(MaiSaleError::Llm("connection reset".to_string())),
        ]);
        let items: Vec<Result<String>> = ndjson_fragments(body).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "a");
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn test_unreachable_service_errors() {
        let mut config = LLMServiceConfig::default();
        config.url = "http://127.0.0.1:9".to_string();
        config.timeout_secs = 2;
        let client = OllamaClient::new(config).unwrap();
        assert!(client.generate("hi").await.is_err());
        assert_eq!(client.metrics().total_errors, 1);
    }
}
