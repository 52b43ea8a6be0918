//! Semantic ranker: distance scoring, stable ordering and relevance tiers.

use std::{cmp::Ordering, fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    errors::SearchError,
    record::{Listing, RelevanceTier, ScoredListing},
};

/// Scores strictly below this are [`RelevanceTier::High`].
pub const DEFAULT_HIGH_TIER_MAX: f32 = 1.2;
/// Scores strictly below this (and not High) are [`RelevanceTier::Medium`].
pub const DEFAULT_MEDIUM_TIER_MAX: f32 = 1.5;

/// Distance function of the vector space. Lower is more similar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// `1 - cos(a, b)`.
    Cosine,
    /// L2 distance.
    Euclid,
    /// Squared L2 distance.
    #[default]
    SquaredEuclid,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclid => "euclid",
            DistanceMetric::SquaredEuclid => "squared_euclid",
        }
    }

    /// Distance between two vectors of equal length.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => {
                let (mut dot, mut na, mut nb) = (0.0f32, 0.0f32, 0.0f32);
                for (x, y) in a.iter().zip(b) {
                    dot += x * y;
                    na += x * x;
                    nb += y * y;
                }
                if na == 0.0 || nb == 0.0 {
                    return 1.0;
                }
                1.0 - dot / (na.sqrt() * nb.sqrt())
            }
            DistanceMetric::Euclid => squared_l2(a, b).sqrt(),
            DistanceMetric::SquaredEuclid => squared_l2(a, b),
        }
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" | "cos" => Ok(DistanceMetric::Cosine),
            "euclid" | "euclidean" | "l2" => Ok(DistanceMetric::Euclid),
            "squared_euclid" | "squared_l2" | "l2sq" => Ok(DistanceMetric::SquaredEuclid),
            other => Err(SearchError::Config(format!(
                "unknown distance metric `{other}` (expected cosine, euclid or squared_euclid)"
            ))),
        }
    }
}

/// Score thresholds separating the three relevance tiers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub high_max: f32,
    pub medium_max: f32,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            high_max: DEFAULT_HIGH_TIER_MAX,
            medium_max: DEFAULT_MEDIUM_TIER_MAX,
        }
    }
}

impl TierThresholds {
    pub fn tier(&self, score: f32) -> RelevanceTier {
        if score < self.high_max {
            RelevanceTier::High
        } else if score < self.medium_max {
            RelevanceTier::Medium
        } else {
            RelevanceTier::Low
        }
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.high_max.is_nan() || self.high_max <= 0.0 || !self.medium_max.is_finite() {
            return Err(SearchError::Config(
                "tier thresholds must be positive and finite".into(),
            ));
        }
        if self.high_max > self.medium_max {
            return Err(SearchError::Config(format!(
                "high tier max {} exceeds medium tier max {}",
                self.high_max, self.medium_max
            )));
        }
        Ok(())
    }
}

/// Ascending order with NaN sorted last.
fn cmp_scores(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Orders `candidates` by distance to `query` and keeps the first `limit`.
///
/// Without a query vector the candidates keep their input order and carry no
/// score. With one, the sort is stable so ties keep input order.
///
/// # Errors
/// [`SearchError::VectorSizeMismatch`] if a candidate embedding length differs
/// from the query vector.
pub fn rank(
    candidates: Vec<Arc<Listing>>,
    query: Option<&[f32]>,
    limit: usize,
    metric: DistanceMetric,
    thresholds: &TierThresholds,
) -> Result<Vec<ScoredListing>, SearchError> {
    let Some(q) = query else {
        return Ok(candidates
            .into_iter()
            .take(limit)
            .map(ScoredListing::unscored)
            .collect());
    };

    let mut scored = Vec::with_capacity(candidates.len());
    for listing in candidates {
        if listing.embedding.len() != q.len() {
            return Err(SearchError::VectorSizeMismatch {
                got: q.len(),
                want: listing.embedding.len(),
            });
        }
        let score = metric.distance(q, &listing.embedding);
        trace!(id = %listing.id, score, "scored candidate");
        scored.push((score, listing));
    }

    scored.sort_by(|a, b| cmp_scores(a.0, b.0));
    scored.truncate(limit);

    Ok(scored
        .into_iter()
        .map(|(score, listing)| ScoredListing {
            listing,
            score: Some(score),
            tier: Some(thresholds.tier(score)),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Amenities, ListingType};

    fn with_embedding(id: &str, embedding: Vec<f32>) -> Arc<Listing> {
        Arc::new(Listing {
            id: id.into(),
            title: id.into(),
            price: 1000.0,
            currency: "PLN".into(),
            city: "Gdańsk".into(),
            district: None,
            neighbourhood: None,
            room_count: 2,
            space_sm: 50.0,
            listing_type: ListingType::Rent,
            link: format!("https://x/{id}"),
            description: None,
            market_type: None,
            building_type: None,
            build_year: None,
            rent_fee: None,
            amenities: Amenities::default(),
            embedding,
        })
    }

    fn candidates() -> Vec<Arc<Listing>> {
        vec![
            with_embedding("far", vec![3.0, 0.0]),
            with_embedding("near", vec![0.5, 0.0]),
            with_embedding("mid", vec![0.0, 1.1]),
            with_embedding("tie", vec![0.0, 0.5]),
            with_embedding("mid2", vec![1.3, 0.0]),
        ]
    }

    #[test]
    fn tiers_follow_thresholds() {
        let t = TierThresholds::default();
        assert_eq!(t.tier(1.0), RelevanceTier::High);
        assert_eq!(t.tier(1.3), RelevanceTier::Medium);
        assert_eq!(t.tier(1.7), RelevanceTier::Low);
        assert_eq!(t.tier(1.2), RelevanceTier::Medium);
        assert_eq!(t.tier(1.5), RelevanceTier::Low);
    }

    #[test]
    fn sorted_ascending_and_truncated_to_prefix() {
        let q = [0.0f32, 0.0];
        let t = TierThresholds::default();
        let full = rank(candidates(), Some(&q), 10, DistanceMetric::Euclid, &t).unwrap();
        assert_eq!(full.len(), 5);
        let scores: Vec<f32> = full.iter().map(|s| s.score.unwrap()).collect();
        assert!(scores.windows(2).all(|w| w[0] <= w[1]));
        // equal distances keep input order
        assert_eq!(full[0].listing.id, "near");
        assert_eq!(full[1].listing.id, "tie");

        for n in 0..=6 {
            let top = rank(candidates(), Some(&q), n, DistanceMetric::Euclid, &t).unwrap();
            assert_eq!(top.len(), n.min(5));
            for (a, b) in top.iter().zip(&full) {
                assert_eq!(a.listing.id, b.listing.id);
            }
        }
    }

    #[test]
    fn no_query_keeps_input_order_without_scores() {
        let out = rank(
            candidates(),
            None,
            3,
            DistanceMetric::default(),
            &TierThresholds::default(),
        )
        .unwrap();
        let ids: Vec<&str> = out.iter().map(|s| s.listing.id.as_str()).collect();
        assert_eq!(ids, vec!["far", "near", "mid"]);
        assert!(out.iter().all(|s| s.score.is_none() && s.tier.is_none()));
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let err = rank(
            candidates(),
            Some(&[0.0, 0.0, 0.0]),
            5,
            DistanceMetric::Cosine,
            &TierThresholds::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SearchError::VectorSizeMismatch { got: 3, want: 2 }));
    }

    #[test]
    fn nan_scores_sort_last() {
        let c = vec![
            with_embedding("nan", vec![f32::NAN, 0.0]),
            with_embedding("ok", vec![1.0, 0.0]),
        ];
        let out = rank(
            c,
            Some(&[0.0, 0.0]),
            2,
            DistanceMetric::SquaredEuclid,
            &TierThresholds::default(),
        )
        .unwrap();
        assert_eq!(out[0].listing.id, "ok");
        assert_eq!(out[1].listing.id, "nan");
    }

    #[test]
    fn metrics_agree_on_simple_vectors() {
        let a = [1.0f32, 0.0];
        let b = [0.0f32, 1.0];
        assert!((DistanceMetric::Cosine.distance(&a, &b) - 1.0).abs() < 1e-6);
        assert!((DistanceMetric::Euclid.distance(&a, &b) - 2f32.sqrt()).abs() < 1e-6);
        assert!((DistanceMetric::SquaredEuclid.distance(&a, &b) - 2.0).abs() < 1e-6);
        assert!(DistanceMetric::Cosine.distance(&a, &a).abs() < 1e-6);
        assert_eq!("l2".parse::<DistanceMetric>().unwrap(), DistanceMetric::Euclid);
        assert!("manhattan".parse::<DistanceMetric>().is_err());
    }

    #[test]
    fn inverted_thresholds_are_invalid() {
        let t = TierThresholds {
            high_max: 1.6,
            medium_max: 1.5,
        };
        assert!(t.validate().is_err());
        assert!(TierThresholds::default().validate().is_ok());
    }
}
