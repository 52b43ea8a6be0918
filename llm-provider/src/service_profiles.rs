//! Shared LLM service with two optional profiles: `embedding` and `chat`.
//!
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Caches underlying HTTP clients per config (provider+endpoint+model+key+timeout).
//! - A missing profile surfaces as [`ConfigError::MissingVar`] when used.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use llm_provider::service_profiles::LlmServiceProfiles;
//! use llm_provider::config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
//!
//! # async fn run() -> Result<(), llm_provider::error_handler::AiLlmError> {
//! let embedding = LlmModelConfig {
//!     provider: LlmProvider::Ollama,
//!     model: "bge-m3".into(),
//!     endpoint: "http://localhost:11434".into(),
//!     api_key: None,
//!     temperature: None,
//!     timeout_secs: Some(10),
//! };
//! let svc = Arc::new(LlmServiceProfiles::new(Some(embedding), None, Some(5))?);
//! let v = svc.embed("Mieszkanie 3-pokojowe, Gdańsk").await?;
//! println!("dim = {}", v.len());
//! # Ok(()) }
//! ```

use std::{collections::HashMap, sync::Arc};

use serde_json::Value;
use tokio::sync::RwLock;

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, ConfigError},
    health_service::{HealthService, HealthStatus},
    services::{ExtractionSchema, ollama_service::OllamaService, open_ai_service::OpenAiService},
};

/// Shared service managing the **embedding** and **chat** profiles.
pub struct LlmServiceProfiles {
    embedding: Option<LlmModelConfig>,
    chat: Option<LlmModelConfig>,

    ollama: RwLock<HashMap<ClientKey, Arc<OllamaService>>>,
    openai: RwLock<HashMap<ClientKey, Arc<OpenAiService>>>,

    health: HealthService,
}

impl LlmServiceProfiles {
    /// Creates a new service.
    ///
    /// - `embedding`: profile used by [`Self::embed`]
    /// - `chat`: profile used by [`Self::extract_json`]
    /// - `health_timeout_secs`: timeout for health probes
    pub fn new(
        embedding: Option<LlmModelConfig>,
        chat: Option<LlmModelConfig>,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        Ok(Self {
            embedding,
            chat,
            ollama: RwLock::new(HashMap::new()),
            openai: RwLock::new(HashMap::new()),
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Computes an embedding with the **embedding** profile.
    ///
    /// # Errors
    /// [`ConfigError::MissingVar`] when no embedding profile is set; otherwise
    /// whatever the provider call returns.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        let cfg = self
            .embedding
            .as_ref()
            .ok_or(ConfigError::MissingVar("EMBEDDING_PROVIDER"))?;
        match cfg.provider {
            LlmProvider::Ollama => self.get_or_init_ollama(cfg).await?.embeddings(input).await,
            LlmProvider::OpenAI => self.get_or_init_openai(cfg).await?.embeddings(input).await,
        }
    }

    /// Runs a structured extraction with the **chat** profile.
    ///
    /// # Errors
    /// [`ConfigError::MissingVar`] when no chat profile is set.
    pub async fn extract_json(
        &self,
        prompt: &str,
        schema: &ExtractionSchema,
    ) -> Result<Option<Value>, AiLlmError> {
        let cfg = self
            .chat
            .as_ref()
            .ok_or(ConfigError::MissingVar("CHAT_PROVIDER"))?;
        match cfg.provider {
            LlmProvider::Ollama => {
                self.get_or_init_ollama(cfg)
                    .await?
                    .extract_json(prompt, schema)
                    .await
            }
            LlmProvider::OpenAI => {
                self.get_or_init_openai(cfg)
                    .await?
                    .extract_json(prompt, schema)
                    .await
            }
        }
    }

    /// Health snapshot for every configured profile.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let mut out = Vec::with_capacity(2);
        if let Some(cfg) = &self.embedding {
            out.push(self.health.check("embedding", cfg).await);
        }
        if let Some(cfg) = &self.chat {
            out.push(self.health.check("chat", cfg).await);
        }
        out
    }

    /// Returns `(embedding, chat)` profiles.
    pub fn profiles(&self) -> (Option<&LlmModelConfig>, Option<&LlmModelConfig>) {
        (self.embedding.as_ref(), self.chat.as_ref())
    }

    pub fn has_chat(&self) -> bool {
        self.chat.is_some()
    }

    /* --------------------- Internals --------------------- */

    async fn get_or_init_ollama(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<Arc<OllamaService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.ollama.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.ollama.write().await;
        if let Some(cli) = w.get(&key).cloned() {
            return Ok(cli);
        }
        let cli = Arc::new(OllamaService::new(cfg.clone())?);
        w.insert(key, cli.clone());
        Ok(cli)
    }

    async fn get_or_init_openai(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<Arc<OpenAiService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.openai.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.openai.write().await;
        if let Some(cli) = w.get(&key).cloned() {
            return Ok(cli);
        }
        let cli = Arc::new(OpenAiService::new(cfg.clone())?);
        w.insert(key, cli.clone());
        Ok(cli)
    }
}

/// Internal cache key to identify unique client configs.
#[derive(Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    provider: LlmProvider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Option<u64>,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout_secs,
        }
    }
}
