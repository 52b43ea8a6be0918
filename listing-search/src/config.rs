//! Search configuration read from environment variables.
//!
//! | Variable               | Default                  |
//! |------------------------|--------------------------|
//! | `LISTINGS_PATH`        | `data/listings.jsonl`    |
//! | `EMBEDDING_DIM`        | inferred from snapshot   |
//! | `SEARCH_DISTANCE`      | `squared_euclid`         |
//! | `SEARCH_DEFAULT_LIMIT` | `5`                      |
//! | `SEARCH_DISPLAY_CAP`   | `5`                      |
//! | `TIER_HIGH_MAX`        | `1.2`                    |
//! | `TIER_MEDIUM_MAX`      | `1.5`                    |
//! | `EMBED_TIMEOUT_SECS`   | `10`                     |
//! | `EMBED_MAX_RETRIES`    | `2`                      |
//! | `EMBED_BACKOFF_MS`     | `200`                    |
//! | `LINK_BASE_URL`        | `https://www.otodom.pl`  |
//! | `INGEST_CONCURRENCY`   | `4`                      |

use std::{path::PathBuf, str::FromStr, time::Duration};

use crate::{
    errors::SearchError,
    rank::{DistanceMetric, TierThresholds},
    record::DEFAULT_LIMIT,
    retry::RetryPolicy,
};

pub const DEFAULT_LISTINGS_PATH: &str = "data/listings.jsonl";
pub const DEFAULT_DISPLAY_CAP: usize = 5;
pub const DEFAULT_LINK_BASE_URL: &str = "https://www.otodom.pl";
pub const DEFAULT_INGEST_CONCURRENCY: usize = 4;

/// Runtime configuration of the search core.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchConfig {
    /// JSONL snapshot backing the in-memory store.
    pub listings_path: PathBuf,
    /// Required embedding length; `None` accepts whatever the snapshot holds.
    pub embedding_dim: Option<usize>,
    pub distance: DistanceMetric,
    pub default_limit: usize,
    /// Results rendered per text block.
    pub display_cap: usize,
    pub tiers: TierThresholds,
    pub retry: RetryPolicy,
    /// Prefix for site-relative listing links.
    pub link_base: String,
    pub ingest_concurrency: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            listings_path: PathBuf::from(DEFAULT_LISTINGS_PATH),
            embedding_dim: None,
            distance: DistanceMetric::default(),
            default_limit: DEFAULT_LIMIT,
            display_cap: DEFAULT_DISPLAY_CAP,
            tiers: TierThresholds::default(),
            retry: RetryPolicy::default(),
            link_base: DEFAULT_LINK_BASE_URL.to_string(),
            ingest_concurrency: DEFAULT_INGEST_CONCURRENCY,
        }
    }
}

impl SearchConfig {
    /// Reads the configuration from environment, falling back to defaults.
    ///
    /// # Errors
    /// [`SearchError::Config`] for unparsable values or a config that fails
    /// [`SearchConfig::validate`].
    pub fn from_env() -> Result<Self, SearchError> {
        let d = SearchConfig::default();

        let distance = match read_env::<String>("SEARCH_DISTANCE")? {
            Some(s) => s.parse::<DistanceMetric>()?,
            None => d.distance,
        };

        let cfg = SearchConfig {
            listings_path: read_env::<PathBuf>("LISTINGS_PATH")?.unwrap_or(d.listings_path),
            embedding_dim: read_env("EMBEDDING_DIM")?,
            distance,
            default_limit: read_env("SEARCH_DEFAULT_LIMIT")?.unwrap_or(d.default_limit),
            display_cap: read_env("SEARCH_DISPLAY_CAP")?.unwrap_or(d.display_cap),
            tiers: TierThresholds {
                high_max: read_env("TIER_HIGH_MAX")?.unwrap_or(d.tiers.high_max),
                medium_max: read_env("TIER_MEDIUM_MAX")?.unwrap_or(d.tiers.medium_max),
            },
            retry: RetryPolicy {
                max_retries: read_env("EMBED_MAX_RETRIES")?.unwrap_or(d.retry.max_retries),
                base_backoff: read_env::<u64>("EMBED_BACKOFF_MS")?
                    .map(Duration::from_millis)
                    .unwrap_or(d.retry.base_backoff),
                attempt_timeout: read_env::<u64>("EMBED_TIMEOUT_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or(d.retry.attempt_timeout),
            },
            link_base: read_env("LINK_BASE_URL")?.unwrap_or(d.link_base),
            ingest_concurrency: read_env("INGEST_CONCURRENCY")?.unwrap_or(d.ingest_concurrency),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.default_limit == 0 {
            return Err(SearchError::Config("SEARCH_DEFAULT_LIMIT must be > 0".into()));
        }
        if self.display_cap == 0 {
            return Err(SearchError::Config("SEARCH_DISPLAY_CAP must be > 0".into()));
        }
        if self.embedding_dim == Some(0) {
            return Err(SearchError::Config("EMBEDDING_DIM must be > 0".into()));
        }
        if self.retry.attempt_timeout.is_zero() {
            return Err(SearchError::Config("EMBED_TIMEOUT_SECS must be > 0".into()));
        }
        if self.ingest_concurrency == 0 {
            return Err(SearchError::Config("INGEST_CONCURRENCY must be > 0".into()));
        }
        if !(self.link_base.starts_with("http://") || self.link_base.starts_with("https://")) {
            return Err(SearchError::Config(
                "LINK_BASE_URL must start with http:// or https://".into(),
            ));
        }
        self.tiers.validate()
    }
}

/// Reads an optional typed value from env; unset or blank is `None`.
fn read_env<T: FromStr>(key: &str) -> Result<Option<T>, SearchError> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| SearchError::Config(format!("invalid value for {key}: `{v}`"))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = SearchConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.distance, DistanceMetric::SquaredEuclid);
        assert_eq!(c.default_limit, 5);
        assert_eq!(c.tiers.high_max, 1.2);
    }

    #[test]
    fn zero_limit_and_inverted_tiers_are_rejected() {
        let zero = SearchConfig {
            default_limit: 0,
            ..SearchConfig::default()
        };
        assert!(zero.validate().is_err());

        let inverted = SearchConfig {
            tiers: TierThresholds {
                high_max: 2.0,
                medium_max: 1.0,
            },
            ..SearchConfig::default()
        };
        assert!(inverted.validate().is_err());
    }
}
