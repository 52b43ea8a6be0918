use std::sync::Arc;

use listing_search::{CriteriaExtractor, HybridSearch};
use llm_provider::LlmServiceProfiles;

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Search engine over the loaded snapshot.
    pub search: Arc<HybridSearch>,
    /// LLM profiles, probed by `/health`.
    pub llm: Arc<LlmServiceProfiles>,
    /// Prompt → criteria extraction for `/chat`; `None` without a chat profile.
    pub extractor: Option<Arc<dyn CriteriaExtractor>>,
}

impl AppState {
    pub fn new(
        search: Arc<HybridSearch>,
        llm: Arc<LlmServiceProfiles>,
        extractor: Option<Arc<dyn CriteriaExtractor>>,
    ) -> Self {
        Self {
            search,
            llm,
            extractor,
        }
    }
}
