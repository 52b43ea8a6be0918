//! Embedding provider backed by the shared LLM service (OpenAI or Ollama).

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use llm_provider::{
    AiLlmError, LlmServiceProfiles, config::default_config::DEFAULT_EMBED_TIMEOUT_SECS,
    error_handler::ProviderErrorKind,
};
use tracing::{debug, warn};

use crate::{embed::EmbeddingsProvider, errors::ProviderError};

pub struct LlmEmbedder {
    svc: Arc<LlmServiceProfiles>,
    expected_dim: Option<usize>,
    timeout: Duration,
    name: String,
}

impl LlmEmbedder {
    /// Wraps the embedding profile of `svc`.
    ///
    /// `expected_dim`, when set, rejects vectors of any other length.
    pub fn new(svc: Arc<LlmServiceProfiles>, expected_dim: Option<usize>) -> Self {
        let (timeout, name) = match svc.profiles().0 {
            Some(cfg) => (
                cfg.timeout_secs.unwrap_or(DEFAULT_EMBED_TIMEOUT_SECS),
                format!("{:?}:{}", cfg.provider, cfg.model),
            ),
            None => (DEFAULT_EMBED_TIMEOUT_SECS, "llm:unconfigured".to_string()),
        };
        Self {
            svc,
            expected_dim,
            timeout: Duration::from_secs(timeout),
            name,
        }
    }
}

/// Maps LLM client failures onto [`ProviderError`].
///
/// `timeout` is reported for client-side timeouts, which carry no duration.
pub(crate) fn provider_error_from(e: AiLlmError, timeout: Duration) -> ProviderError {
    if e.is_timeout() {
        return ProviderError::Timeout(timeout);
    }
    match e {
        AiLlmError::Config(c) => {
            warn!(error = %c, "LLM profile misconfigured");
            ProviderError::NotConfigured
        }
        AiLlmError::Provider(p) => {
            let msg = p.to_string();
            match p.kind {
                ProviderErrorKind::HttpStatus(h) => ProviderError::Status {
                    status: h.status.as_u16(),
                    detail: h.snippet,
                },
                ProviderErrorKind::Decode(_) | ProviderErrorKind::EmptyChoices => {
                    ProviderError::Malformed(msg)
                }
                _ => {
                    warn!(error = %msg, "LLM client rejected its profile");
                    ProviderError::NotConfigured
                }
            }
        }
        other => ProviderError::Unreachable(other.to_string()),
    }
}

impl EmbeddingsProvider for LlmEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, ProviderError>> + Send + 'a>> {
        Box::pin(async move {
            let v = self
                .svc
                .embed(text)
                .await
                .map_err(|e| provider_error_from(e, self.timeout))?;
            if v.is_empty() {
                return Err(ProviderError::Malformed("empty embedding vector".into()));
            }
            if let Some(want) = self.expected_dim {
                if v.len() != want {
                    return Err(ProviderError::DimensionMismatch { got: v.len(), want });
                }
            }
            debug!(provider = %self.name, dim = v.len(), "embedded text");
            Ok(v)
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_profile_maps_to_not_configured() {
        let svc = Arc::new(LlmServiceProfiles::new(None, None, Some(1)).unwrap());
        let e = LlmEmbedder::new(svc, Some(8));
        assert_eq!(e.name(), "llm:unconfigured");
        assert_eq!(e.embed("x").await, Err(ProviderError::NotConfigured));
    }
}
