//! OpenAI embeddings and chat completions.
//!
//! This module is only available when the `openai` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::Generator;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 3072;
const DEFAULT_CHAT_MODEL: &str = "gpt-4";

/// Connection settings shared by [`OpenAIEmbeddingProvider`] and
/// [`OpenAIGenerator`].
///
/// The API key is always passed in explicitly; nothing here reads the
/// environment.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    /// API root, without a trailing slash.
    pub base_url: String,
    pub embedding_model: String,
    /// Dimensionality of `embedding_model`'s vectors.
    pub embedding_dimensions: usize,
    /// When set, requests Matryoshka truncation to `embedding_dimensions`.
    pub truncate_dimensions: bool,
    pub chat_model: String,
    pub temperature: f32,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            truncate_dimensions: false,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: 0.0,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the embedding model and the dimensionality it produces.
    pub fn with_embedding_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.embedding_model = model.into();
        self.embedding_dimensions = dimensions;
        self
    }

    /// Ask the API to truncate embeddings to `dimensions`.
    pub fn with_truncated_dimensions(mut self, dimensions: usize) -> Self {
        self.embedding_dimensions = dimensions;
        self.truncate_dimensions = true;
        self
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn check(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(RagError::Config("OpenAI API key must not be empty".to_string()));
        }
        Ok(())
    }
}

/// An [`EmbeddingProvider`] backed by the OpenAI `/embeddings` endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use litnav_rag::openai::{OpenAIConfig, OpenAIEmbeddingProvider};
///
/// let provider = OpenAIEmbeddingProvider::new(OpenAIConfig::new("sk-..."))?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    config: OpenAIConfig,
}

impl OpenAIEmbeddingProvider {
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the API key is empty.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        config.check()?;
        Ok(Self { client: reqwest::Client::new(), config })
    }

    pub fn model(&self) -> &str {
        &self.config.embedding_model
    }
}

/// A [`Generator`] backed by the OpenAI `/chat/completions` endpoint.
pub struct OpenAIGenerator {
    client: reqwest::Client,
    config: OpenAIConfig,
}

impl OpenAIGenerator {
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the API key is empty.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        config.check()?;
        Ok(Self { client: reqwest::Client::new(), config })
    }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Turn a non-2xx response into a readable message, preferring the API's
/// own error text.
async fn failure_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail =
        serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
    format!("API returned {status}: {detail}")
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "OpenAI", text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| RagError::embedding("OpenAI returned an empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = "OpenAI",
            batch_size = texts.len(),
            model = %self.config.embedding_model,
            "embedding batch"
        );

        let request_body = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: texts,
            dimensions: self.config.truncate_dimensions.then_some(self.config.embedding_dimensions),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "OpenAI", error = %e, "embedding request failed");
                RagError::embedding(format!("OpenAI request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let detail = failure_detail(response).await;
            error!(provider = "OpenAI", %detail, "embedding API error");
            return Err(RagError::embedding(detail));
        }

        let mut parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "failed to parse embedding response");
            RagError::embedding(format!("failed to parse OpenAI response: {e}"))
        })?;

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.config.embedding_dimensions
    }
}

// ── Generator implementation ───────────────────────────────────────

#[async_trait]
impl Generator for OpenAIGenerator {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        debug!(
            provider = "OpenAI",
            model = %self.config.chat_model,
            prompt_len = user_prompt.len(),
            "requesting chat completion"
        );

        let request_body = ChatRequest {
            model: &self.config.chat_model,
            messages: [
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: user_prompt },
            ],
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "OpenAI", error = %e, "chat request failed");
                RagError::generation(format!("OpenAI request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let detail = failure_detail(response).await;
            error!(provider = "OpenAI", %detail, "chat API error");
            return Err(RagError::generation(detail));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "failed to parse chat response");
            RagError::generation(format!("failed to parse OpenAI response: {e}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RagError::generation("OpenAI returned no completion"))
    }

    fn model(&self) -> &str {
        &self.config.chat_model
    }
}
