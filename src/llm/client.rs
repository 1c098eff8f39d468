//! Client for a local Ollama-protocol inference server.
//!
//! `POST /api/generate` streams NDJSON chunks; `POST /api/embeddings`
//! returns a single vector. The client never retries: transient failures
//! surface to the caller, and re-enrichment sweeps pick up articles whose
//! summary stayed empty.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::prompts;
use super::sanitize;
use crate::utils::Deadline;

/// Deadline for a single generate call.
const GENERATE_TIMEOUT: Duration = Duration::from_secs(60);
/// Deadline for a single embedding call.
const EMBED_TIMEOUT: Duration = Duration::from_secs(30);
/// Cap on the error body captured for logging.
const ERROR_BODY_CAP: usize = 1024;

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "llama3.1:8b".to_string()
}
fn default_embed_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_draft_model() -> String {
    "llama3.1:70b".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    768
}

/// Configuration for the LLM client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Inference server endpoint.
    pub endpoint: String,
    /// Default instruction-tuned model.
    pub model: String,
    /// Embedding model.
    pub embed_model: String,
    /// Higher-capability override for PR drafts and the daily brief.
    pub draft_model: String,
    pub temperature: f32,
    /// Maximum tokens per response.
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            embed_model: default_embed_model(),
            draft_model: default_draft_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Errors from LLM operations. No internal retries.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network-level failure or timeout reaching the server.
    #[error("LLM unavailable: {0}")]
    Unavailable(String),
    /// Non-2xx response from the server.
    #[error("LLM rejected request (HTTP {status}): {body_snippet}")]
    Rejected { status: u16, body_snippet: String },
    /// The model produced no usable output.
    #[error("LLM returned empty output")]
    Empty,
}

/// The enrichment-facing surface of the LLM client. Object-safe so jobs can
/// run against a stub in tests.
#[async_trait]
pub trait LlmService: Send + Sync {
    /// 2-3 sentence summary in the article's language; empty string when the
    /// output was suppressed by the garbage detector.
    async fn summarize(&self, text: &str) -> Result<String, LlmError>;

    /// Taxonomy tags for the article; possibly empty after validation.
    async fn classify(&self, text: &str) -> Result<Vec<String>, LlmError>;

    /// People, organizations, and places named in the article.
    async fn extract_entities(&self, text: &str) -> Result<Vec<String>, LlmError>;

    /// Embedding vector; never empty on success.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;

    /// Free-form generation, optionally on an override model.
    async fn generate(
        &self,
        model: Option<&str>,
        system: &str,
        user: &str,
    ) -> Result<String, LlmError>;
}

/// Concrete client over HTTP.
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        // No client-level timeout: each call caps itself by its own deadline.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client");
        Self { config, client }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Stream a generation and accumulate chunk responses until `done`.
    ///
    /// A decode or stream failure after content has accumulated returns the
    /// partial text rather than erroring; downstream sanitization still
    /// gates persistence.
    async fn generate_raw(
        &self,
        model: &str,
        system: Option<&str>,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, LlmError> {
        let deadline = Deadline::after(timeout);
        let request = GenerateRequest {
            model,
            system,
            prompt,
            stream: true,
            options: GenerateOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let url = format!("{}/api/generate", self.config.endpoint);
        let response = tokio::time::timeout(
            deadline.remaining(),
            self.client.post(&url).json(&request).send(),
        )
        .await
        .map_err(|_| LlmError::Unavailable("generate timed out".to_string()))?
        .map_err(|e| LlmError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = tokio::time::timeout(deadline.remaining(), response.text())
                .await
                .unwrap_or_else(|_| Ok(String::new()))
                .unwrap_or_default();
            let body_snippet = body.chars().take(ERROR_BODY_CAP).collect();
            return Err(LlmError::Rejected {
                status,
                body_snippet,
            });
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut accumulated = String::new();
        let mut done = false;

        loop {
            let chunk = match tokio::time::timeout(deadline.remaining(), stream.next()).await {
                Ok(Some(Ok(bytes))) => bytes,
                Ok(Some(Err(e))) => {
                    if accumulated.is_empty() {
                        return Err(LlmError::Unavailable(e.to_string()));
                    }
                    warn!(error = %e, "stream broke mid-generation, keeping partial output");
                    break;
                }
                Ok(None) => break,
                Err(_) => {
                    if accumulated.is_empty() {
                        return Err(LlmError::Unavailable("generate timed out".to_string()));
                    }
                    warn!("generate deadline hit mid-stream, keeping partial output");
                    break;
                }
            };

            buffer.push_str(&String::from_utf8_lossy(&chunk));

            done = false;
            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim().to_string();
                buffer.drain(..=newline);
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<GenerateChunk>(&line) {
                    Ok(chunk) => {
                        accumulated.push_str(&chunk.response);
                        if chunk.done {
                            done = true;
                            break;
                        }
                    }
                    Err(e) => {
                        if accumulated.is_empty() {
                            return Err(LlmError::Unavailable(format!(
                                "stream decode failed: {}",
                                e
                            )));
                        }
                        warn!(error = %e, "stream decode failed, keeping partial output");
                        done = true;
                        break;
                    }
                }
            }
            if done {
                break;
            }
        }

        // A final object may arrive without a trailing newline.
        if !done {
            let tail = buffer.trim();
            if !tail.is_empty() {
                if let Ok(chunk) = serde_json::from_str::<GenerateChunk>(tail) {
                    accumulated.push_str(&chunk.response);
                }
            }
        }

        debug!(model, chars = accumulated.len(), "generation complete");
        Ok(accumulated)
    }
}

#[async_trait]
impl LlmService for LlmClient {
    async fn summarize(&self, text: &str) -> Result<String, LlmError> {
        let raw = self
            .generate_raw(
                &self.config.model,
                Some(prompts::SUMMARIZE_SYSTEM),
                text,
                GENERATE_TIMEOUT,
            )
            .await?;
        Ok(sanitize::sanitize_summary(&raw))
    }

    async fn classify(&self, text: &str) -> Result<Vec<String>, LlmError> {
        let raw = self
            .generate_raw(
                &self.config.model,
                Some(prompts::CLASSIFY_SYSTEM),
                text,
                GENERATE_TIMEOUT,
            )
            .await?;
        Ok(sanitize::validate_tags(&raw))
    }

    async fn extract_entities(&self, text: &str) -> Result<Vec<String>, LlmError> {
        let raw = self
            .generate_raw(
                &self.config.model,
                Some(prompts::ENTITIES_SYSTEM),
                text,
                GENERATE_TIMEOUT,
            )
            .await?;
        Ok(sanitize::parse_entities(&raw))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let request = EmbeddingsRequest {
            model: &self.config.embed_model,
            prompt: text,
        };
        let url = format!("{}/api/embeddings", self.config.endpoint);
        let response = tokio::time::timeout(
            EMBED_TIMEOUT,
            self.client.post(&url).json(&request).send(),
        )
        .await
        .map_err(|_| LlmError::Unavailable("embedding timed out".to_string()))?
        .map_err(|e| LlmError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Rejected {
                status,
                body_snippet: body.chars().take(ERROR_BODY_CAP).collect(),
            });
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;
        if parsed.embedding.is_empty() {
            return Err(LlmError::Empty);
        }
        Ok(parsed.embedding)
    }

    async fn generate(
        &self,
        model: Option<&str>,
        system: &str,
        user: &str,
    ) -> Result<String, LlmError> {
        let model = model.unwrap_or(&self.config.model);
        let raw = self
            .generate_raw(model, Some(system), user, GENERATE_TIMEOUT)
            .await?;
        let trimmed = raw.trim().to_string();
        if trimmed.is_empty() {
            return Err(LlmError::Empty);
        }
        Ok(trimmed)
    }
}

/// Truncate text to a UTF-8-safe byte budget for model input.
pub fn truncate_for_model(text: &str, max_chars: usize) -> &str {
    if text.len() <= max_chars {
        return text;
    }
    let mut end = max_chars;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "año ".repeat(3000);
        let cut = truncate_for_model(&text, 8000);
        assert!(cut.len() <= 8000);
        assert!(cut.is_char_boundary(cut.len()));
        assert_eq!(truncate_for_model("short", 8000), "short");
    }

    #[test]
    fn default_config_points_at_local_server() {
        let config = LlmConfig::default();
        assert_eq!(config.endpoint, "http://localhost:11434");
        assert!(!config.model.is_empty());
        assert_ne!(config.model, config.draft_model);
    }

    #[test]
    fn chunk_decoding_tolerates_missing_fields() {
        let chunk: GenerateChunk = serde_json::from_str(r#"{"response":"hi"}"#).unwrap();
        assert_eq!(chunk.response, "hi");
        assert!(!chunk.done);

        let done: GenerateChunk = serde_json::from_str(r#"{"done":true}"#).unwrap();
        assert!(done.done);
        assert!(done.response.is_empty());
    }
}
