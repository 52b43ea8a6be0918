//! Read-only listing repository.

use std::{collections::BTreeMap, path::Path, sync::Arc};

use serde::Serialize;
use tracing::info;

use crate::{
    errors::SearchError,
    filters::CoarseFilter,
    io_jsonl,
    record::{Listing, ListingType},
};

/// Aggregate counts over a store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub total: usize,
    pub rent: usize,
    pub sale: usize,
    pub by_city: BTreeMap<String, usize>,
    pub embedding_dim: Option<usize>,
}

/// Injected read-only repository of listings.
pub trait ListingStore: Send + Sync {
    /// Every listing, in snapshot order.
    fn list_all(&self) -> Vec<Arc<Listing>>;

    /// Listings passing the coarse pre-filter, in snapshot order.
    fn list_matching(&self, coarse: &CoarseFilter) -> Vec<Arc<Listing>> {
        self.list_all()
            .into_iter()
            .filter(|l| coarse.matches(l))
            .collect()
    }

    /// Common embedding length, `None` when the store holds no vectors.
    fn embedding_dim(&self) -> Option<usize>;

    fn stats(&self) -> StoreStats {
        let mut s = StoreStats {
            embedding_dim: self.embedding_dim(),
            ..StoreStats::default()
        };
        for l in self.list_all() {
            s.total += 1;
            match l.listing_type {
                ListingType::Rent => s.rent += 1,
                ListingType::Sale => s.sale += 1,
            }
            *s.by_city.entry(l.city.clone()).or_default() += 1;
        }
        s
    }
}

/// In-memory store loaded from a JSONL snapshot.
#[derive(Debug, Default)]
pub struct MemoryListingStore {
    listings: Vec<Arc<Listing>>,
    dim: Option<usize>,
}

impl MemoryListingStore {
    /// Builds a store, enforcing one embedding length across all listings.
    ///
    /// # Errors
    /// [`SearchError::VectorSizeMismatch`] when lengths differ from each other
    /// or from `expected_dim`.
    pub fn new(listings: Vec<Listing>, expected_dim: Option<usize>) -> Result<Self, SearchError> {
        let dim = match listings.first() {
            Some(first) if !first.embedding.is_empty() => Some(first.embedding.len()),
            _ => None,
        };

        let want = dim.unwrap_or(0);
        if let Some(bad) = listings.iter().find(|l| l.embedding.len() != want) {
            return Err(SearchError::VectorSizeMismatch {
                got: bad.embedding.len(),
                want,
            });
        }
        if let (Some(want), Some(got)) = (expected_dim, dim) {
            if want != got {
                return Err(SearchError::VectorSizeMismatch { got, want });
            }
        }

        Ok(Self {
            listings: listings.into_iter().map(Arc::new).collect(),
            dim,
        })
    }

    /// Loads a snapshot written by `--populate`.
    pub fn from_jsonl(
        path: impl AsRef<Path>,
        expected_dim: Option<usize>,
        link_base: &str,
    ) -> Result<Self, SearchError> {
        let listings = io_jsonl::read_listings(path.as_ref(), link_base)?;
        let store = Self::new(listings, expected_dim)?;
        info!(
            total = store.listings.len(),
            dim = ?store.dim,
            path = ?path.as_ref(),
            "listing store loaded"
        );
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

impl ListingStore for MemoryListingStore {
    fn list_all(&self) -> Vec<Arc<Listing>> {
        self.listings.clone()
    }

    fn embedding_dim(&self) -> Option<usize> {
        self.dim
    }
}
