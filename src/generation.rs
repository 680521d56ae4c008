//! Generation backends.
//!
//! Implements the [`Generator`] port from `doclens-core`:
//! - **[`DisabledGenerator`]**: fails every call; used when generation is not configured.
//! - **[`OpenAIGenerator`]**: OpenAI-compatible `/v1/chat/completions` with JSON output.
//! - **[`OllamaGenerator`]**: a local Ollama instance's `/api/chat` endpoint.
//!
//! Use [`create_generator`] to instantiate the backend named in the config.
//!
//! # Failure Mapping
//!
//! | Backend signal | [`GenerationError`] |
//! |----------------|---------------------|
//! | HTTP 429 | `RateLimited` (retried) |
//! | HTTP 5xx, network error | `Unavailable` (retried) |
//! | HTTP 400/413 mentioning the context length | `ContextWindowExceeded` |
//! | content filter | `GuardrailViolation` |
//! | unparsable output | `DecodingFailure` |
//! | any other 4xx | `Other` |
//!
//! Retries use exponential backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use doclens_core::generation::{parse_analysis, GenerationError, Generator};
use doclens_core::models::{Analysis, AnalysisKind};

use crate::config::GenerationConfig;

const SYSTEM_PROMPT: &str =
    "You are a careful document analyst. Answer with a single JSON object and nothing else.";

const OPENAI_DEFAULT_URL: &str = "https://api.openai.com";
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Instantiate the generator named by `config.provider`.
///
/// # Errors
///
/// Fails for unknown providers, a missing `model`, or (for `openai`) a
/// missing `OPENAI_API_KEY`.
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator::new(config.context_tokens))),
        "openai" => Ok(Arc::new(OpenAIGenerator::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

// ============ Disabled Generator ============

/// A generator that always fails with [`GenerationError::Unavailable`].
pub struct DisabledGenerator {
    context_tokens: usize,
}

impl DisabledGenerator {
    pub fn new(context_tokens: usize) -> Self {
        Self { context_tokens }
    }
}

#[async_trait]
impl Generator for DisabledGenerator {
    fn name(&self) -> &str {
        "disabled"
    }

    fn context_tokens(&self) -> usize {
        self.context_tokens
    }

    async fn generate(
        &self,
        _prompt: &str,
        _kind: AnalysisKind,
    ) -> Result<Analysis, GenerationError> {
        Err(GenerationError::Unavailable(
            "generation provider is disabled; set [generation].provider in the config".to_string(),
        ))
    }
}

// ============ OpenAI Generator ============

/// Generator using an OpenAI-compatible chat completions API.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAIGenerator {
    name: String,
    model: String,
    url: String,
    api_key: String,
    context_tokens: usize,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            name: format!("openai:{}", model),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_DEFAULT_URL.to_string()),
            model,
            api_key,
            context_tokens: config.context_tokens,
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn context_tokens(&self) -> usize {
        self.context_tokens
    }

    async fn generate(&self, prompt: &str, kind: AnalysisKind) -> Result<Analysis, GenerationError> {
        let endpoint = format!("{}/v1/chat/completions", self.url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "response_format": { "type": "json_object" }
        });

        let response = send_with_retry(&self.name, self.max_retries, || {
            self.client
                .post(&endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await?;

        let content = parse_openai_content(&response)?;
        parse_analysis(kind, &content)
    }
}

/// Extract `choices[0].message.content`, mapping a content-filter stop.
fn parse_openai_content(json: &Value) -> Result<String, GenerationError> {
    let choice = json
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| GenerationError::DecodingFailure("missing choices array".to_string()))?;

    if choice.get("finish_reason").and_then(Value::as_str) == Some("content_filter") {
        return Err(GenerationError::GuardrailViolation);
    }

    choice
        .pointer("/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GenerationError::DecodingFailure("missing message content".to_string()))
}

// ============ Ollama Generator ============

/// Generator using a local Ollama instance.
///
/// Calls `POST /api/chat` on the configured URL (default: `http://localhost:11434`)
/// with `format: "json"` and the context window passed as `num_ctx`.
pub struct OllamaGenerator {
    name: String,
    model: String,
    url: String,
    context_tokens: usize,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for Ollama provider"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            name: format!("ollama:{}", model),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string()),
            model,
            context_tokens: config.context_tokens,
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn context_tokens(&self) -> usize {
        self.context_tokens
    }

    async fn generate(&self, prompt: &str, kind: AnalysisKind) -> Result<Analysis, GenerationError> {
        let endpoint = format!("{}/api/chat", self.url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "format": "json",
            "stream": false,
            "options": { "num_ctx": self.context_tokens }
        });

        let response =
            send_with_retry(&self.name, self.max_retries, || self.client.post(&endpoint).json(&body))
                .await?;

        let content = response
            .pointer("/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| GenerationError::DecodingFailure("missing message content".to_string()))?;
        parse_analysis(kind, content)
    }
}

// ============ Shared HTTP plumbing ============

/// Send a JSON request, retrying retryable failures with backoff.
async fn send_with_retry<F>(
    backend: &str,
    max_retries: u32,
    build: F,
) -> Result<Value, GenerationError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            warn!(backend, attempt, ?delay, "retrying generation request");
            tokio::time::sleep(delay).await;
        }

        match build().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    debug!(backend, %status, "generation response received");
                    return response
                        .json::<Value>()
                        .await
                        .map_err(|e| GenerationError::DecodingFailure(e.to_string()));
                }

                let body_text = response.text().await.unwrap_or_default();
                let err = classify_status(status.as_u16(), &body_text);
                if !err.is_retryable() {
                    return Err(err);
                }
                last_err = Some(err);
            }
            Err(e) => {
                last_err = Some(GenerationError::Unavailable(e.to_string()));
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        GenerationError::Unavailable(format!("{} failed after retries", backend))
    }))
}

/// Map a non-success HTTP status and body onto a typed failure.
fn classify_status(status: u16, body: &str) -> GenerationError {
    let lower = body.to_ascii_lowercase();
    match status {
        429 => GenerationError::RateLimited,
        500..=599 => GenerationError::Unavailable(format!("HTTP {}: {}", status, body)),
        400 | 413
            if lower.contains("context_length")
                || lower.contains("context length")
                || lower.contains("maximum context") =>
        {
            GenerationError::ContextWindowExceeded
        }
        400..=499 if lower.contains("content_filter") || lower.contains("content policy") => {
            GenerationError::GuardrailViolation
        }
        _ => GenerationError::Other(format!("HTTP {}: {}", status, body)),
    }
}
