use listing_search::SearchCriteria;
use serde::{Deserialize, Serialize};

use crate::routes::search::search_request::SearchResponse;

/// Request payload for `/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Message as typed by the user.
    pub prompt: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Response payload for `/chat`.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Extracted criteria; `None` when extraction was unavailable or empty.
    pub criteria: Option<SearchCriteria>,
    #[serde(flatten)]
    pub search: SearchResponse,
}
