use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Response};
use listing_search::StoreStats;
use llm_provider::HealthStatus;
use serde::Serialize;

use crate::core::{app_state::AppState, http::response_envelope::ApiResponse};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` when every configured provider answered, `degraded` otherwise.
    pub status: &'static str,
    pub embedder: String,
    pub store: StoreStats,
    pub providers: Vec<HealthStatus>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let providers = state.llm.health_all().await;
    let status = if providers.iter().all(|p| p.ok) {
        "ok"
    } else {
        "degraded"
    };
    let body = HealthResponse {
        status,
        embedder: state.search.provider_name().to_string(),
        store: state.search.stats(),
        providers,
    };
    ApiResponse::success(body).into_response_with_status(StatusCode::OK)
}
