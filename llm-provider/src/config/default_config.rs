//! Default provider configs loaded from environment variables.
//!
//! Two roles are supported:
//!
//! - **Embedding** → turns listing texts and search queries into vectors
//! - **Chat**      → extracts structured search criteria from a user prompt
//!
//! # Environment variables
//!
//! Embedding:
//! - `EMBEDDING_PROVIDER` = `openai` | `ollama` | `stub` | `none` (default `stub`)
//! - `EMBEDDING_MODEL`    = model id (default depends on provider)
//! - `EMBED_TIMEOUT_SECS` = per-request timeout (default 10)
//!
//! Chat:
//! - `CHAT_PROVIDER`      = `openai` | `ollama` (unset = criteria extraction disabled)
//! - `CHAT_MODEL`         = model id (default `gpt-4o-mini` / `qwen3:14b`)
//! - `CHAT_TIMEOUT_SECS`  = per-request timeout (default 60)
//!
//! Endpoints:
//! - `OPENAI_API_KEY` (required for OpenAI), `OPENAI_URL` (default `https://api.openai.com`)
//! - `OLLAMA_URL` or `OLLAMA_PORT` (required for Ollama)

use tracing::warn;

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt_u64, must_env, opt_env, validate_http_endpoint,
    },
};

/// OpenAI embedding models known to produce compatible vectors.
pub const OPENAI_EMBEDDING_MODELS: &[&str] = &[
    "text-embedding-3-large",
    "text-embedding-3-small",
    "text-embedding-ada-002",
];

/// Default OpenAI embedding model.
pub const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-large";

/// Default Ollama embedding model.
pub const DEFAULT_OLLAMA_EMBEDDING_MODEL: &str = "bge-m3";

/// Default OpenAI chat model for criteria extraction.
pub const DEFAULT_OPENAI_CHAT_MODEL: &str = "gpt-4o-mini";

/// Default Ollama chat model for criteria extraction.
pub const DEFAULT_OLLAMA_CHAT_MODEL: &str = "qwen3:14b";

/// Default per-request embedding timeout.
pub const DEFAULT_EMBED_TIMEOUT_SECS: u64 = 10;

/// Which embedding backend the deployment uses.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingBackend {
    /// Remote or local model served over HTTP.
    Llm(LlmModelConfig),
    /// Deterministic in-process hashing embedder (offline demos and tests).
    Stub,
    /// No embeddings: every query degrades to filter-only results.
    Disabled,
}

/// Resolves the Ollama endpoint from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Some(url) = opt_env("OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = opt_env("OLLAMA_PORT") {
        port.trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidNumber {
                var: "OLLAMA_PORT",
                reason: "expected u16 (1..=65535)",
            })?;
        return Ok(format!("http://localhost:{}", port.trim()));
    }
    Err(ConfigError::MissingVar("OLLAMA_URL or OLLAMA_PORT").into())
}

/// Resolves the OpenAI endpoint and key from environment.
fn openai_endpoint_and_key() -> Result<(String, String), AiLlmError> {
    let endpoint = opt_env("OPENAI_URL").unwrap_or_else(|| "https://api.openai.com".to_string());
    validate_http_endpoint("OPENAI_URL", &endpoint)?;
    let key = must_env("OPENAI_API_KEY")?;
    Ok((endpoint, key))
}

/// Picks the OpenAI embedding model, falling back to the default for unknown names.
fn resolve_openai_embedding_model(requested: Option<String>) -> String {
    match requested {
        Some(m) if OPENAI_EMBEDDING_MODELS.contains(&m.as_str()) => m,
        Some(m) => {
            warn!(
                requested = %m,
                fallback = DEFAULT_OPENAI_EMBEDDING_MODEL,
                "embedding model not in supported list, falling back to default"
            );
            DEFAULT_OPENAI_EMBEDDING_MODEL.to_string()
        }
        None => DEFAULT_OPENAI_EMBEDDING_MODEL.to_string(),
    }
}

/// Constructs the embedding backend from environment.
///
/// # Errors
/// - [`ConfigError::UnsupportedProvider`] for an unknown `EMBEDDING_PROVIDER`
/// - [`ConfigError::MissingVar`] when the chosen provider lacks its endpoint/key
pub fn config_embedding() -> Result<EmbeddingBackend, AiLlmError> {
    let kind = opt_env("EMBEDDING_PROVIDER").unwrap_or_else(|| "stub".to_string());
    let timeout_secs = env_opt_u64("EMBED_TIMEOUT_SECS")?.unwrap_or(DEFAULT_EMBED_TIMEOUT_SECS);

    match kind.trim().to_ascii_lowercase().as_str() {
        "stub" => Ok(EmbeddingBackend::Stub),
        "none" | "disabled" => Ok(EmbeddingBackend::Disabled),
        other => match other.parse::<LlmProvider>()? {
            LlmProvider::OpenAI => {
                let (endpoint, key) = openai_endpoint_and_key()?;
                Ok(EmbeddingBackend::Llm(LlmModelConfig {
                    provider: LlmProvider::OpenAI,
                    model: resolve_openai_embedding_model(opt_env("EMBEDDING_MODEL")),
                    endpoint,
                    api_key: Some(key),
                    temperature: None,
                    timeout_secs: Some(timeout_secs),
                }))
            }
            LlmProvider::Ollama => Ok(EmbeddingBackend::Llm(LlmModelConfig {
                provider: LlmProvider::Ollama,
                model: opt_env("EMBEDDING_MODEL")
                    .unwrap_or_else(|| DEFAULT_OLLAMA_EMBEDDING_MODEL.to_string()),
                endpoint: ollama_endpoint()?,
                api_key: None,
                temperature: None,
                timeout_secs: Some(timeout_secs),
            })),
        },
    }
}

/// Constructs the chat profile used for criteria extraction.
///
/// Returns `Ok(None)` when `CHAT_PROVIDER` is unset.
///
/// # Defaults
/// - `temperature = Some(0.0)` (deterministic extraction)
/// - `timeout_secs = Some(60)`
pub fn config_chat() -> Result<Option<LlmModelConfig>, AiLlmError> {
    let Some(kind) = opt_env("CHAT_PROVIDER") else {
        return Ok(None);
    };
    let timeout_secs = env_opt_u64("CHAT_TIMEOUT_SECS")?.unwrap_or(60);

    let cfg = match kind.parse::<LlmProvider>()? {
        LlmProvider::OpenAI => {
            let (endpoint, key) = openai_endpoint_and_key()?;
            LlmModelConfig {
                provider: LlmProvider::OpenAI,
                model: opt_env("CHAT_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_CHAT_MODEL.into()),
                endpoint,
                api_key: Some(key),
                temperature: Some(0.0),
                timeout_secs: Some(timeout_secs),
            }
        }
        LlmProvider::Ollama => LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: opt_env("CHAT_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_CHAT_MODEL.into()),
            endpoint: ollama_endpoint()?,
            api_key: None,
            temperature: Some(0.0),
            timeout_secs: Some(timeout_secs),
        },
    };
    Ok(Some(cfg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_openai_model_falls_back() {
        assert_eq!(
            resolve_openai_embedding_model(Some("made-up".into())),
            DEFAULT_OPENAI_EMBEDDING_MODEL
        );
        assert_eq!(
            resolve_openai_embedding_model(Some("text-embedding-3-small".into())),
            "text-embedding-3-small"
        );
        assert_eq!(
            resolve_openai_embedding_model(None),
            DEFAULT_OPENAI_EMBEDDING_MODEL
        );
    }
}
