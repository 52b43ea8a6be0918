//! Hybrid search over real-estate listings.
//!
//! This crate provides:
//! - A read-only listing store loaded from a JSONL snapshot
//! - Structured filtering followed by embedding-distance ranking
//! - Chat-ready rendering of the results
//! - Ingestion of raw listings into an embedded snapshot
//!
//! Embedding is delegated to an injected [`EmbeddingsProvider`]; when it fails
//! the search degrades to filter-only results instead of erroring.

mod config;
mod errors;
mod io_jsonl;
mod record;
mod retry;
mod search;
mod store;

pub mod criteria;
pub mod embed;
pub mod filters;
pub mod format;
pub mod ingest;
pub mod rank;

pub use config::{
    DEFAULT_DISPLAY_CAP, DEFAULT_INGEST_CONCURRENCY, DEFAULT_LINK_BASE_URL, DEFAULT_LISTINGS_PATH,
    SearchConfig,
};
pub use criteria::{CriteriaExtractor, LlmCriteriaExtractor, SearchCriteria};
pub use embed::{EmbeddingsProvider, LlmEmbedder, NoopEmbedder, StubEmbedder};
pub use errors::{FilterError, FormatError, ProviderError, Result, SearchError};
pub use filters::{ListingFilter, RoomsPredicate};
pub use format::{NO_RESULTS_MESSAGE, format_outcome, format_results, to_records};
pub use ingest::IngestReport;
pub use io_jsonl::{canonicalize_link, read_all_jsonl, read_listings, write_listings};
pub use rank::{DistanceMetric, TierThresholds};
pub use record::{
    Amenities, Amenity, DEFAULT_CURRENCY, DEFAULT_LIMIT, Listing, ListingType, Query,
    RelevanceTier, ResultRecord, ScoredListing,
};
pub use retry::{MAX_BACKOFF, RetryPolicy, retry_transient};
pub use search::{HybridSearch, SearchOutcome};
pub use store::{ListingStore, MemoryListingStore, StoreStats};
