use listing_search::ResultRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request payload for `/search`.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// Filter mapping, e.g. `{"city": "Gdańsk", "rooms": 2, "max_price": 4000}`.
    #[serde(default)]
    pub filters: Option<Map<String, Value>>,
    /// Free-text semantic query.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    /// Results rendered in `message`; defaults to the configured cap.
    #[serde(default)]
    pub display_cap: Option<usize>,
}

/// Response payload shared by `/search` and `/chat`.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<ResultRecord>,
    /// Listings that passed the filters before truncation.
    pub candidates: usize,
    /// Semantic ranking was requested but unavailable.
    pub degraded: bool,
    /// Chat-ready rendering of `results`.
    pub message: String,
}
