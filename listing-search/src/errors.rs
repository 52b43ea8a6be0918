//! Unified error types for the crate.

use std::time::Duration;

use thiserror::Error;

/// Result alias for listing-search operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Top-level error for listing-search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Malformed filter mapping.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Embedding provider failure that was not degraded away.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// I/O or filesystem errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSONL row that failed strict parsing (1-based line number).
    #[error("line {line} parse error: {reason}")]
    Parse { line: usize, reason: String },

    /// Mismatch in vector dimensionality between store and query, or across records.
    #[error("vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Malformed predicate in a filter mapping. Never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("filter `{key}`: expected {expected}, got {got}")]
    InvalidValue {
        key: String,
        expected: &'static str,
        got: String,
    },

    #[error("filter `{key}`: value must not be negative")]
    Negative { key: String },

    #[error("filter `listing_type`: unknown value `{0}` (expected rent, sale or both)")]
    UnknownListingType(String),

    #[error("filter `{key}`: empty range, min {min} > max {max}")]
    EmptyRange {
        key: &'static str,
        min: f64,
        max: f64,
    },
}

/// Failure of the injected embedding provider.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Network/transport failure reaching the provider.
    #[error("embedding provider unreachable: {0}")]
    Unreachable(String),

    /// Attempt exceeded the per-call timeout.
    #[error("embedding provider timed out after {0:?}")]
    Timeout(Duration),

    /// Non-success HTTP status.
    #[error("embedding provider returned HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    /// Undecodable or empty payload.
    #[error("embedding provider returned malformed output: {0}")]
    Malformed(String),

    /// Vector length differs from the store dimension.
    #[error("embedding has {got} dimensions, expected {want}")]
    DimensionMismatch { got: usize, want: usize },

    /// No provider is configured for this deployment.
    #[error("no embedding provider configured")]
    NotConfigured,
}

impl ProviderError {
    /// Transport failures, timeouts, `429` and `5xx` may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Unreachable(_) | ProviderError::Timeout(_) => true,
            ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// A result record that cannot be rendered.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error("listing `{id}` has an empty {field}")]
    MissingField { id: String, field: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ProviderError::Unreachable("refused".into()).is_transient());
        assert!(ProviderError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(
            ProviderError::Status {
                status: 503,
                detail: String::new()
            }
            .is_transient()
        );
        assert!(
            !ProviderError::Status {
                status: 401,
                detail: String::new()
            }
            .is_transient()
        );
        assert!(!ProviderError::Malformed("x".into()).is_transient());
        assert!(!ProviderError::NotConfigured.is_transient());
    }
}
