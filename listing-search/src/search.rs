//! Hybrid search orchestrator: store → filter → embed → rank.
//!
//! Provider failures never reach the caller of [`HybridSearch::search`]:
//! transient errors are retried, and whatever still fails degrades the query
//! to filter-only results with `degraded = true`.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::SearchConfig,
    embed::EmbeddingsProvider,
    errors::{ProviderError, SearchError},
    filters::{self, ListingFilter},
    rank,
    record::{Listing, Query, ScoredListing},
    retry::retry_transient,
    store::{ListingStore, StoreStats},
};

/// Result of one hybrid query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Ranked (or filter-ordered) hits, at most `limit`.
    pub hits: Vec<ScoredListing>,
    /// Listings that passed the filter stage, before truncation.
    pub candidates: usize,
    /// `true` when semantic ranking was requested but skipped.
    pub degraded: bool,
}

/// Composes the injected store and embedding provider.
pub struct HybridSearch {
    store: Arc<dyn ListingStore>,
    embedder: Arc<dyn EmbeddingsProvider>,
    cfg: SearchConfig,
}

impl HybridSearch {
    pub fn new(
        store: Arc<dyn ListingStore>,
        embedder: Arc<dyn EmbeddingsProvider>,
        cfg: SearchConfig,
    ) -> Self {
        info!(
            provider = embedder.name(),
            distance = %cfg.distance,
            dim = ?store.embedding_dim(),
            "hybrid search ready"
        );
        Self {
            store,
            embedder,
            cfg,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.cfg
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Name of the injected embedding provider.
    pub fn provider_name(&self) -> &str {
        self.embedder.name()
    }

    /// Runs a hybrid query.
    ///
    /// # Errors
    /// Only store-level inconsistencies; provider failures degrade instead.
    #[instrument(skip_all, fields(has_text = query.text.is_some(), limit = query.limit))]
    pub async fn search(&self, query: &Query) -> Result<SearchOutcome, SearchError> {
        let limit = self.effective_limit(query.limit);
        let pool = self.store.list_matching(&query.filters.coarse());
        let candidates = filters::apply(&pool, &query.filters);
        let total = candidates.len();
        debug!(pool = pool.len(), candidates = total, "filter stage done");

        let text = match query.text.as_deref() {
            Some(t) if total > 0 => t,
            _ => {
                return Ok(SearchOutcome {
                    hits: self.rank(candidates, None, limit)?,
                    candidates: total,
                    degraded: false,
                });
            }
        };

        match self.embed_query(text).await {
            Ok(v) => Ok(SearchOutcome {
                hits: self.rank(candidates, Some(&v), limit)?,
                candidates: total,
                degraded: false,
            }),
            Err(e) => {
                warn!(
                    provider = self.embedder.name(),
                    error = %e,
                    "semantic ranking unavailable, returning filter-only results"
                );
                Ok(SearchOutcome {
                    hits: self.rank(candidates, None, limit)?,
                    candidates: total,
                    degraded: true,
                })
            }
        }
    }

    /// Parses a filter mapping and runs [`Self::search`].
    ///
    /// # Errors
    /// [`SearchError::Filter`] for a malformed mapping.
    pub async fn search_map(
        &self,
        filters: &Map<String, Value>,
        text: Option<&str>,
        limit: Option<usize>,
    ) -> Result<SearchOutcome, SearchError> {
        let mut q = Query::new(ListingFilter::from_map(filters)?);
        if let Some(t) = text {
            q = q.with_text(t);
        }
        q.limit = limit.unwrap_or(self.cfg.default_limit);
        self.search(&q).await
    }

    /// Ranks the whole store by similarity to `text`.
    ///
    /// # Errors
    /// Propagates [`ProviderError`] after retries; no degraded fallback.
    #[instrument(skip_all, fields(limit = limit))]
    pub async fn semantic_only(
        &self,
        text: &str,
        limit: usize,
    ) -> Result<Vec<ScoredListing>, SearchError> {
        let v = self.embed_query(text).await?;
        self.rank(self.store.list_all(), Some(&v), self.effective_limit(limit))
    }

    /// Embeds `text` with retry, timeout and a dimension check against the store.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let want = self.store.embedding_dim().ok_or_else(|| {
            ProviderError::Malformed("listing store holds no embeddings".into())
        })?;
        let embedder = &self.embedder;
        let v = retry_transient(&self.cfg.retry, "embed query", || embedder.embed(text)).await?;
        if v.len() != want {
            return Err(ProviderError::DimensionMismatch { got: v.len(), want });
        }
        Ok(v)
    }

    fn effective_limit(&self, limit: usize) -> usize {
        if limit == 0 {
            self.cfg.default_limit
        } else {
            limit
        }
    }

    fn rank(
        &self,
        candidates: Vec<Arc<Listing>>,
        query: Option<&[f32]>,
        limit: usize,
    ) -> Result<Vec<ScoredListing>, SearchError> {
        rank::rank(candidates, query, limit, self.cfg.distance, &self.cfg.tiers)
    }
}
