use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use listing_search::{ListingFilter, Query, SearchCriteria};
use tracing::{debug, info, warn};

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::{AppError, AppResult},
    routes::{
        chat::chat_request::{ChatRequest, ChatResponse},
        search::search_route::{request_id, search_response},
    },
};

/// Prompt → criteria → hybrid search → chat-ready message.
///
/// Extraction failures are not fatal: the prompt is still used as semantic
/// text over the unfiltered store and the response is marked degraded.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(p): Json<ChatRequest>,
) -> AppResult<Response> {
    let request_id = request_id(&headers);
    let prompt = p.prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::BadRequest("prompt must not be empty".into()));
    }
    let limit = p.limit.unwrap_or(state.search.config().default_limit);

    let (criteria, extraction_failed): (Option<SearchCriteria>, bool) = match &state.extractor {
        Some(ex) => match ex.extract(prompt).await {
            Ok(c) => (c, false),
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "criteria extraction failed");
                (None, true)
            }
        },
        None => {
            debug!(request_id = %request_id, "no chat profile, skipping criteria extraction");
            (None, false)
        }
    };

    let query = match &criteria {
        Some(c) => c.to_query(prompt, limit)?,
        None => Query::new(ListingFilter::default())
            .with_text(prompt)
            .with_limit(limit),
    };
    let outcome = state.search.search(&query).await?;
    info!(
        request_id = %request_id,
        hits = outcome.hits.len(),
        has_criteria = criteria.is_some(),
        degraded = outcome.degraded || extraction_failed,
        "chat route: success"
    );

    let mut search = search_response(outcome, state.search.config().display_cap);
    search.degraded |= extraction_failed;
    Ok(ApiResponse::success(ChatResponse { criteria, search })
        .into_response_with_status(StatusCode::OK))
}
