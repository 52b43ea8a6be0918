use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use listing_search::{FilterError, ProviderError, SearchError};
use thiserror::Error;
use tracing::error;

use crate::core::http::response_envelope::{ApiErrorDetail, ApiResponse};

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request ---
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(#[from] FilterError),

    /// Rich HTTP error mapped from lower layers with specific status & code.
    #[error("{message}")]
    Http {
        status: StatusCode,
        code: &'static str,
        message: String,
    },
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::InvalidFilter(_) => StatusCode::BAD_REQUEST,
            AppError::Http { status, .. } => *status,
            AppError::Bind(_) | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::InvalidFilter(_) => "INVALID_FILTER",
            AppError::Http { code, .. } => code,
        }
    }

    fn path(&self) -> Option<String> {
        match self {
            AppError::InvalidFilter(e) => Some(match e {
                FilterError::InvalidValue { key, .. } | FilterError::Negative { key } => {
                    format!("filters.{key}")
                }
                FilterError::EmptyRange { key, .. } => format!("filters.{key}"),
                FilterError::UnknownListingType(_) => "filters.listing_type".to_string(),
            }),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, code = self.error_code(), "request failed");
        }
        let details = self
            .path()
            .map(|path| {
                vec![ApiErrorDetail {
                    path: Some(path),
                    hint: None,
                }]
            })
            .unwrap_or_default();
        ApiResponse::<()>::error(self.error_code(), self.to_string(), details)
            .into_response_with_status(status)
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        let (status, code) = match &err {
            ProviderError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "PROVIDER_TIMEOUT"),
            ProviderError::NotConfigured => {
                (StatusCode::SERVICE_UNAVAILABLE, "PROVIDER_NOT_CONFIGURED")
            }
            _ => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
        };
        AppError::Http {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Filter(e) => AppError::InvalidFilter(e),
            SearchError::Provider(e) => e.into(),
            other => AppError::Http {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "SEARCH_FAILED",
                message: format!("Search failed: {other}"),
            },
        }
    }
}
