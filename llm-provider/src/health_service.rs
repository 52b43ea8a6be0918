//! Health probes for the configured LLM backends.
//!
//! - Ollama: `GET {endpoint}/api/tags` (checks the model is pulled)
//! - OpenAI: `GET {endpoint}/v1/models` with Bearer auth (checks the model id)
//!
//! [`HealthService::check`] never fails; every problem is reported as
//! `ok = false` so the result can be served from `/health` as is.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, HttpError, Provider, ProviderError, ProviderErrorKind, make_snippet,
    },
    services::{is_http_endpoint, join_url},
};

/// Serializable health snapshot for one provider/config.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Role of the profile (`embedding`, `chat`).
    pub role: String,
    /// Backend name (`Ollama`, `OpenAI`).
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    pub ok: bool,
    pub latency_ms: u128,
    /// Short human-readable detail.
    pub message: String,
}

/// Health checker reusing one HTTP client for all probes.
pub struct HealthService {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HealthService {
    /// Creates a new health service with an optional timeout (seconds, default 10).
    ///
    /// # Errors
    /// Returns [`AiLlmError::HttpTransport`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        info!(default_timeout_secs = timeout.as_secs(), "HealthService initialized");
        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    /// Probes one config. Failures are folded into the returned status.
    pub async fn check(&self, role: &str, cfg: &LlmModelConfig) -> HealthStatus {
        let started = Instant::now();
        let mut status = HealthStatus {
            role: role.to_string(),
            provider: format!("{:?}", cfg.provider),
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            ok: false,
            latency_ms: 0,
            message: String::new(),
        };

        if !is_http_endpoint(&cfg.endpoint) {
            warn!(provider = ?cfg.provider, endpoint = %cfg.endpoint, "invalid endpoint");
            status.message = "endpoint is empty or missing http/https".into();
            return status;
        }

        let result = match cfg.provider {
            LlmProvider::Ollama => self.probe_ollama(cfg).await,
            LlmProvider::OpenAI => self.probe_openai(cfg).await,
        };
        status.latency_ms = started.elapsed().as_millis();

        match result {
            Ok((ok, message)) => {
                status.ok = ok;
                status.message = message;
                info!(
                    role,
                    provider = %status.provider,
                    model = %status.model,
                    ok,
                    latency_ms = status.latency_ms,
                    "health probe completed"
                );
            }
            Err(err) => {
                status.message = err.to_string();
                warn!(
                    role,
                    provider = %status.provider,
                    endpoint = %status.endpoint,
                    latency_ms = status.latency_ms,
                    message = %status.message,
                    "health probe failed"
                );
            }
        }
        status
    }

    async fn probe_ollama(&self, cfg: &LlmModelConfig) -> Result<(bool, String), AiLlmError> {
        #[derive(Deserialize)]
        struct Tag {
            name: String,
        }
        #[derive(Deserialize)]
        struct Tags {
            models: Option<Vec<Tag>>,
        }

        let url = join_url(&cfg.endpoint, "api/tags");
        debug!(provider = "Ollama", "GET {}", url);
        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout_for(cfg))
            .send()
            .await?;
        let resp = ensure_success(Provider::Ollama, resp, url).await?;

        // Ollama tags carry the `:latest` suffix when none was given.
        let wanted = if cfg.model.contains(':') {
            cfg.model.clone()
        } else {
            format!("{}:latest", cfg.model)
        };

        Ok(match resp.json::<Tags>().await {
            Ok(Tags {
                models: Some(models),
            }) => {
                if models.iter().any(|m| m.name == cfg.model || m.name == wanted) {
                    (true, "Ollama is healthy; model is available".into())
                } else {
                    (false, "Ollama is up, but model not found in /api/tags".into())
                }
            }
            Ok(Tags { models: None }) => (true, "Ollama is healthy; no model list".into()),
            Err(e) => (true, format!("Ollama is reachable; failed to decode /api/tags: {e}")),
        })
    }

    async fn probe_openai(&self, cfg: &LlmModelConfig) -> Result<(bool, String), AiLlmError> {
        #[derive(Deserialize)]
        struct ModelItem {
            id: String,
        }
        #[derive(Deserialize)]
        struct Models {
            data: Vec<ModelItem>,
        }

        let api_key = cfg.api_key.as_deref().ok_or_else(|| {
            ProviderError::new(Provider::OpenAI, ProviderErrorKind::MissingApiKey)
        })?;

        let url = join_url(&cfg.endpoint, "v1/models");
        debug!(provider = "OpenAI", "GET {}", url);
        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout_for(cfg))
            .header(header::AUTHORIZATION, format!("Bearer {api_key}"))
            .send()
            .await?;
        let resp = ensure_success(Provider::OpenAI, resp, url).await?;

        Ok(match resp.json::<Models>().await {
            Ok(models) if models.data.iter().any(|m| m.id == cfg.model) => {
                (true, "OpenAI is healthy; model is available".into())
            }
            Ok(_) => (false, "OpenAI is up, but model not found in /v1/models".into()),
            Err(e) => (true, format!("OpenAI is reachable; failed to decode /v1/models: {e}")),
        })
    }

    fn timeout_for(&self, cfg: &LlmModelConfig) -> Duration {
        cfg.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout)
    }
}

async fn ensure_success(
    provider: Provider,
    resp: reqwest::Response,
    url: String,
) -> Result<reqwest::Response, AiLlmError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let snippet = make_snippet(&resp.text().await.unwrap_or_default());
    Err(ProviderError::new(
        provider,
        ProviderErrorKind::HttpStatus(HttpError {
            status,
            url,
            snippet,
        }),
    )
    .into())
}
