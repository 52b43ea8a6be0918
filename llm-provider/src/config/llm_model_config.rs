use crate::config::llm_provider::LlmProvider;

/// Configuration for one model invocation profile (embedding or chat).
///
/// # Fields
///
/// - `provider`: which backend serves the model.
/// - `model`: model identifier (e.g., `"text-embedding-3-large"`, `"bge-m3"`).
/// - `endpoint`: base URL without path (e.g., `https://api.openai.com`).
/// - `api_key`: optional key for providers that require authentication.
/// - `temperature`: sampling temperature for chat profiles.
/// - `timeout_secs`: per-request timeout in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    /// The provider/backend.
    pub provider: LlmProvider,

    /// Model identifier string.
    pub model: String,

    /// Base endpoint URL.
    pub endpoint: String,

    /// Optional API key (OpenAI).
    pub api_key: Option<String>,

    /// Sampling temperature (chat only).
    pub temperature: Option<f32>,

    /// Optional request timeout (in seconds).
    pub timeout_secs: Option<u64>,
}
