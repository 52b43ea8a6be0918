//! OpenAI service for embeddings and structured criteria extraction.
//!
//! Minimal, non-streaming client around the OpenAI REST API.
//! Endpoints are derived from `LlmModelConfig::endpoint`:
//! - POST {endpoint}/v1/embeddings       — embeddings retrieval
//! - POST {endpoint}/v1/chat/completions — tool-call extraction
//!
//! Constructor validation:
//! - `cfg.provider` must be `LlmProvider::OpenAI`
//! - `cfg.api_key` must be present
//! - `cfg.endpoint` must start with http:// or https://

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, HttpError, Provider, ProviderError, ProviderErrorKind, make_snippet,
    },
    services::{ExtractionSchema, is_http_endpoint, join_url},
};

/// Thin client for the OpenAI API.
///
/// Keeps a preconfigured `reqwest::Client` (timeout + auth header).
#[derive(Debug)]
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_chat: String,
    url_embeddings: String,
}

impl OpenAiService {
    /// Creates a new [`OpenAiService`] from the given config.
    ///
    /// # Errors
    /// - [`ProviderErrorKind::InvalidProvider`] if `cfg.provider` is not OpenAI
    /// - [`ProviderErrorKind::MissingApiKey`] if `cfg.api_key` is `None`
    /// - [`ProviderErrorKind::InvalidEndpoint`] if `cfg.endpoint` is invalid
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        if cfg.provider != LlmProvider::OpenAI {
            return Err(
                ProviderError::new(Provider::OpenAI, ProviderErrorKind::InvalidProvider).into(),
            );
        }

        let api_key = cfg.api_key.clone().ok_or_else(|| {
            ProviderError::new(Provider::OpenAI, ProviderErrorKind::MissingApiKey)
        })?;

        if !is_http_endpoint(&cfg.endpoint) {
            return Err(ProviderError::new(
                Provider::OpenAI,
                ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone()),
            )
            .into());
        }

        let timeout = Duration::from_secs(cfg.timeout_secs.unwrap_or(60));

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                ProviderError::new(
                    Provider::OpenAI,
                    ProviderErrorKind::Decode(format!("invalid API key header: {e}")),
                )
            })?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        let url_chat = join_url(&cfg.endpoint, "v1/chat/completions");
        let url_embeddings = join_url(&cfg.endpoint, "v1/embeddings");

        info!(
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            timeout_secs = timeout.as_secs(),
            "OpenAiService initialized"
        );

        Ok(Self {
            client,
            cfg,
            url_chat,
            url_embeddings,
        })
    }

    /// Retrieves a single embeddings vector via `/v1/embeddings`.
    ///
    /// # Errors
    /// - [`ProviderErrorKind::HttpStatus`] for non-2xx responses
    /// - [`AiLlmError::HttpTransport`] for client/network failures
    /// - [`ProviderErrorKind::Decode`] if the JSON cannot be parsed or `data` is empty
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        let started = Instant::now();
        let body = EmbeddingsRequest {
            model: &self.cfg.model,
            input,
        };

        debug!(input_len = input.len(), "POST {}", self.url_embeddings);

        let resp = self
            .client
            .post(&self.url_embeddings)
            .json(&body)
            .send()
            .await?;
        let resp = self.check_status(resp, &self.url_embeddings, started).await?;

        let out: EmbeddingsResponse = resp.json().await.map_err(|e| {
            error!(error = %e, "failed to decode /v1/embeddings response");
            ProviderError::new(
                Provider::OpenAI,
                ProviderErrorKind::Decode(format!("serde error: {e}; expected `data[0].embedding`")),
            )
        })?;

        let first = out.data.into_iter().next().ok_or_else(|| {
            ProviderError::new(
                Provider::OpenAI,
                ProviderErrorKind::Decode("empty `data` in embeddings response".into()),
            )
        })?;

        debug!(
            dim = first.embedding.len(),
            latency_ms = started.elapsed().as_millis(),
            "embeddings completed"
        );

        Ok(first.embedding)
    }

    /// Asks the chat model to call `schema` and returns the parsed arguments.
    ///
    /// Returns `Ok(None)` when the model answered in plain text instead of
    /// calling the tool.
    ///
    /// # Errors
    /// - [`ProviderErrorKind::HttpStatus`] for non-2xx responses
    /// - [`ProviderErrorKind::EmptyChoices`] if no choice was returned
    /// - [`ProviderErrorKind::Decode`] if the arguments are not valid JSON
    #[instrument(skip_all, fields(model = %self.cfg.model, tool = %schema.name))]
    pub async fn extract_json(
        &self,
        prompt: &str,
        schema: &ExtractionSchema,
    ) -> Result<Option<Value>, AiLlmError> {
        let started = Instant::now();
        let body = ChatCompletionRequest {
            model: &self.cfg.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            tools: vec![Tool {
                kind: "function",
                function: ToolFunction {
                    name: &schema.name,
                    description: &schema.description,
                    parameters: &schema.parameters,
                },
            }],
            tool_choice: "auto",
            temperature: self.cfg.temperature,
        };

        debug!(prompt_len = prompt.len(), "POST {}", self.url_chat);

        let resp = self.client.post(&self.url_chat).json(&body).send().await?;
        let resp = self.check_status(resp, &self.url_chat, started).await?;

        let out: ChatCompletionResponse = resp.json().await.map_err(|e| {
            ProviderError::new(
                Provider::OpenAI,
                ProviderErrorKind::Decode(format!("serde error: {e}; expected `choices[0].message`")),
            )
        })?;

        let message = out
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| ProviderError::new(Provider::OpenAI, ProviderErrorKind::EmptyChoices))?;

        let Some(call) = message
            .tool_calls
            .into_iter()
            .find(|c| c.function.name == schema.name)
        else {
            info!(
                latency_ms = started.elapsed().as_millis(),
                "model answered without a tool call"
            );
            return Ok(None);
        };

        let args: Value = serde_json::from_str(&call.function.arguments).map_err(|e| {
            ProviderError::new(
                Provider::OpenAI,
                ProviderErrorKind::Decode(format!("tool arguments are not JSON: {e}")),
            )
        })?;

        info!(
            latency_ms = started.elapsed().as_millis(),
            "criteria extraction completed"
        );
        Ok(Some(args))
    }

    async fn check_status(
        &self,
        resp: reqwest::Response,
        url: &str,
        started: Instant,
    ) -> Result<reqwest::Response, AiLlmError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        let snippet = make_snippet(&text);

        error!(
            %status,
            %url,
            %snippet,
            latency_ms = started.elapsed().as_millis(),
            "OpenAI returned non-success status"
        );

        Err(ProviderError::new(
            Provider::OpenAI,
            ProviderErrorKind::HttpStatus(HttpError {
                status,
                url: url.to_string(),
                snippet,
            }),
        )
        .into())
    }
}

/* ===========================================================================
HTTP payloads
======================================================================== */

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    tools: Vec<Tool<'a>>,
    tool_choice: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct Tool<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    function: ToolFunction<'a>,
}

#[derive(Debug, Serialize)]
struct ToolFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageOut,
}

#[derive(Debug, Deserialize)]
struct ChatMessageOut {
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: ToolCallFunction,
}

#[derive(Debug, Deserialize)]
struct ToolCallFunction {
    name: String,
    arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::OpenAI,
            model: "text-embedding-3-small".into(),
            endpoint: "https://api.openai.com".into(),
            api_key: Some("sk-test".into()),
            temperature: None,
            timeout_secs: Some(5),
        }
    }

    #[test]
    fn rejects_missing_key_and_wrong_provider() {
        let mut no_key = cfg();
        no_key.api_key = None;
        assert!(OpenAiService::new(no_key).is_err());

        let mut wrong = cfg();
        wrong.provider = LlmProvider::Ollama;
        assert!(OpenAiService::new(wrong).is_err());
    }

    #[test]
    fn builds_urls_from_endpoint() {
        let svc = OpenAiService::new(cfg()).unwrap();
        assert_eq!(svc.url_embeddings, "https://api.openai.com/v1/embeddings");
        assert_eq!(svc.url_chat, "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn tool_call_response_decodes() {
        let raw = r#"{"choices":[{"message":{"content":null,"tool_calls":[
            {"id":"c1","type":"function","function":{"name":"extract","arguments":"{\"city\":\"Gdańsk\"}"}}]}}]}"#;
        let out: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        let call = &out.choices[0].message.tool_calls[0];
        assert_eq!(call.function.name, "extract");
        let args: Value = serde_json::from_str(&call.function.arguments).unwrap();
        assert_eq!(args["city"], "Gdańsk");
    }
}
