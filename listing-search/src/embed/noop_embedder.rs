use crate::{embed::EmbeddingsProvider, errors::ProviderError};
use std::{future::Future, pin::Pin};

/// Embedder for deployments without a provider.
///
/// Always fails with [`ProviderError::NotConfigured`], so hybrid queries
/// degrade to filter-only results.
pub struct NoopEmbedder;

impl EmbeddingsProvider for NoopEmbedder {
    fn embed<'a>(
        &'a self,
        _text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, ProviderError>> + Send + 'a>> {
        Box::pin(async { Err(ProviderError::NotConfigured) })
    }

    fn name(&self) -> &str {
        "noop"
    }
}
