use crate::errors::ProviderError;
use std::{future::Future, pin::Pin};

/// Provider interface for embedding generation.
///
/// Implement this trait to plug in an embedding backend (OpenAI, Ollama, a
/// local model, or a deterministic test double).
pub trait EmbeddingsProvider: Send + Sync {
    /// Async embedding function: text → fixed-length vector.
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, ProviderError>> + Send + 'a>>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

pub mod llm_embedder;
pub mod noop_embedder;
pub mod stub_embedder;

pub use llm_embedder::LlmEmbedder;
pub use noop_embedder::NoopEmbedder;
pub use stub_embedder::StubEmbedder;
