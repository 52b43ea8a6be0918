//! Lightweight Ollama service for embeddings and structured extraction.
//!
//! - `POST {endpoint}/api/embed` — embeddings retrieval
//! - `POST {endpoint}/api/chat`  — non-streaming chat with a JSON-schema `format`

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, HttpError, Provider, ProviderError, ProviderErrorKind, make_snippet,
    },
    services::{ExtractionSchema, is_http_endpoint, join_url},
};

/// Thin client for Ollama.
pub struct OllamaService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_chat: String,
    url_embed: String,
}

impl OllamaService {
    /// Creates a new [`OllamaService`] from the given config.
    ///
    /// # Errors
    /// - [`ProviderErrorKind::InvalidProvider`] if `cfg.provider` is not `Ollama`
    /// - [`ProviderErrorKind::InvalidEndpoint`] if `cfg.endpoint` is invalid
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        if cfg.provider != LlmProvider::Ollama {
            return Err(
                ProviderError::new(Provider::Ollama, ProviderErrorKind::InvalidProvider).into(),
            );
        }
        if !is_http_endpoint(&cfg.endpoint) {
            return Err(ProviderError::new(
                Provider::Ollama,
                ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone()),
            )
            .into());
        }

        let timeout = Duration::from_secs(cfg.timeout_secs.unwrap_or(60));
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let url_chat = join_url(&cfg.endpoint, "api/chat");
        let url_embed = join_url(&cfg.endpoint, "api/embed");

        Ok(Self {
            client,
            cfg,
            url_chat,
            url_embed,
        })
    }

    /// Retrieves the embedding of one input via `/api/embed`.
    ///
    /// # Errors
    /// - [`ProviderErrorKind::HttpStatus`] for non-2xx responses
    /// - [`AiLlmError::HttpTransport`] for client errors
    /// - [`ProviderErrorKind::Decode`] if the response has no embedding
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        let started = Instant::now();
        let body = EmbedRequest {
            model: &self.cfg.model,
            input,
        };

        debug!(input_len = input.len(), "POST {}", self.url_embed);
        let resp = self.client.post(&self.url_embed).json(&body).send().await?;
        let resp = check_status(resp, &self.url_embed, started).await?;

        let out: EmbedResponse = resp.json().await.map_err(|e| {
            ProviderError::new(
                Provider::Ollama,
                ProviderErrorKind::Decode(format!(
                    "serde error: {e}; expected `{{ embeddings: number[][] }}`"
                )),
            )
        })?;

        out.embeddings.into_iter().next().ok_or_else(|| {
            ProviderError::new(
                Provider::Ollama,
                ProviderErrorKind::Decode("empty `embeddings` in response".into()),
            )
            .into()
        })
    }

    /// Asks the model for a JSON object constrained by `schema.parameters`.
    ///
    /// Returns `Ok(None)` when the model produced an empty object.
    ///
    /// # Errors
    /// - [`ProviderErrorKind::HttpStatus`] for non-2xx responses
    /// - [`ProviderErrorKind::Decode`] if the content is not JSON
    #[instrument(skip_all, fields(model = %self.cfg.model, tool = %schema.name))]
    pub async fn extract_json(
        &self,
        prompt: &str,
        schema: &ExtractionSchema,
    ) -> Result<Option<Value>, AiLlmError> {
        let started = Instant::now();
        let body = ChatRequest {
            model: &self.cfg.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &schema.description,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
            format: &schema.parameters,
            options: ChatOptions {
                temperature: self.cfg.temperature,
            },
        };

        debug!(prompt_len = prompt.len(), "POST {}", self.url_chat);
        let resp = self.client.post(&self.url_chat).json(&body).send().await?;
        let resp = check_status(resp, &self.url_chat, started).await?;

        let out: ChatResponse = resp.json().await.map_err(|e| {
            ProviderError::new(
                Provider::Ollama,
                ProviderErrorKind::Decode(format!("serde error: {e}; expected `message.content`")),
            )
        })?;

        let value: Value = serde_json::from_str(out.message.content.trim()).map_err(|e| {
            ProviderError::new(
                Provider::Ollama,
                ProviderErrorKind::Decode(format!("content is not JSON: {e}")),
            )
        })?;

        match &value {
            Value::Object(m) if m.is_empty() => Ok(None),
            Value::Object(_) => Ok(Some(value)),
            _ => Err(ProviderError::new(
                Provider::Ollama,
                ProviderErrorKind::Decode("expected a JSON object".into()),
            )
            .into()),
        }
    }
}

async fn check_status(
    resp: reqwest::Response,
    url: &str,
    started: Instant,
) -> Result<reqwest::Response, AiLlmError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let snippet = make_snippet(&resp.text().await.unwrap_or_default());
    error!(
        %status,
        %url,
        %snippet,
        latency_ms = started.elapsed().as_millis(),
        "Ollama returned non-success status"
    );
    Err(ProviderError::new(
        Provider::Ollama,
        ProviderErrorKind::HttpStatus(HttpError {
            status,
            url: url.to_string(),
            snippet,
        }),
    )
    .into())
}

/* ==========================
HTTP payloads
========================== */

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    format: &'a Value,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessageOut,
}

#[derive(Debug, Deserialize)]
struct ChatMessageOut {
    content: String,
}
