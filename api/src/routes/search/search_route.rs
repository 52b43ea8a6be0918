use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use listing_search::{SearchOutcome, format_outcome, to_records};
use serde_json::Map;
use tracing::debug;

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::AppResult,
    routes::search::search_request::{SearchRequest, SearchResponse},
};

pub(crate) fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get("X-Request-Id")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-")
}

/// Builds the shared response body from a search outcome.
pub(crate) fn search_response(outcome: SearchOutcome, display_cap: usize) -> SearchResponse {
    SearchResponse {
        message: format_outcome(&outcome, display_cap),
        results: to_records(&outcome.hits),
        candidates: outcome.candidates,
        degraded: outcome.degraded,
    }
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(p): Json<SearchRequest>,
) -> AppResult<Response> {
    let request_id = request_id(&headers);
    debug!(
        request_id = %request_id,
        query = ?p.query,
        "search route: start"
    );

    let filters = p.filters.unwrap_or_else(Map::new);
    let outcome = state
        .search
        .search_map(&filters, p.query.as_deref(), p.limit)
        .await?;

    debug!(
        request_id = %request_id,
        hits = outcome.hits.len(),
        degraded = outcome.degraded,
        "search route: success"
    );

    let cap = p
        .display_cap
        .filter(|c| *c > 0)
        .unwrap_or(state.search.config().display_cap);
    Ok(ApiResponse::success(search_response(outcome, cap)).into_response_with_status(StatusCode::OK))
}
