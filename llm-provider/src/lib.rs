//! LLM provider clients used by listing search.
//!
//! - [`service_profiles::LlmServiceProfiles`] holds the embedding and chat profiles
//! - [`config::default_config`] reads them from environment
//! - [`health_service::HealthService`] probes the backends for `/health`

pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod services;

pub use config::default_config::{EmbeddingBackend, config_chat, config_embedding};
pub use config::llm_model_config::LlmModelConfig;
pub use config::llm_provider::LlmProvider;
pub use error_handler::AiLlmError;
pub use health_service::HealthStatus;
pub use service_profiles::LlmServiceProfiles;
pub use services::ExtractionSchema;
