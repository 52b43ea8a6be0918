//! Free-text prompt → structured search criteria → [`Query`].
//!
//! The chat model is asked to call an `extract_search_criteria` function whose
//! arguments follow [`criteria_schema`]. Zero and blank values are treated as
//! "not mentioned" because models tend to fill every field of the schema.

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use llm_provider::{ExtractionSchema, LlmServiceProfiles};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::{
    embed::llm_embedder::provider_error_from,
    errors::{FilterError, ProviderError},
    filters::ListingFilter,
    record::{Amenity, Query},
};

/// Criteria as returned by the chat model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_count: Option<f64>,
    /// Minimum area in m².
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_sm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    /// `kupno` (buy) or `wynajem` (rent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_build_year: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_build_year: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_czynsz: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_balcony: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_garage: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_parking: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_elevator: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_air_conditioning: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pets_allowed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub furnished: Option<bool>,
}

impl SearchCriteria {
    fn amenity(&self, a: Amenity) -> Option<bool> {
        match a {
            Amenity::Balcony => self.has_balcony,
            Amenity::Garage => self.has_garage,
            Amenity::Parking => self.has_parking,
            Amenity::Elevator => self.has_elevator,
            Amenity::AirConditioning => self.has_air_conditioning,
            Amenity::PetsAllowed => self.pets_allowed,
            Amenity::Furnished => self.furnished,
        }
    }

    /// Builds the filter mapping understood by [`ListingFilter::from_map`].
    ///
    /// Only amenities explicitly requested (`true`) become predicates; a model
    /// answering `false` usually means "not mentioned".
    pub fn to_filter_map(&self) -> Map<String, Value> {
        let mut m = Map::new();
        let mut put_str = |key: &str, v: &Option<String>| {
            if let Some(s) = v.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                m.insert(key.to_string(), Value::String(s.to_string()));
            }
        };
        put_str("city", &self.city);
        put_str("district", &self.district);
        put_str("market_type", &self.market_type);
        put_str("building_type", &self.building_type);

        let positive = |v: Option<f64>| v.filter(|x| *x > 0.0);
        if let Some(n) = positive(self.room_count) {
            m.insert("rooms".into(), json!(n.round() as u64));
        }
        if let Some(a) = positive(self.space_sm) {
            m.insert("min_area".into(), json!(a));
        }
        if let Some(p) = positive(self.max_price) {
            m.insert("max_price".into(), json!(p));
        }
        if let Some(y) = positive(self.min_build_year) {
            m.insert("min_build_year".into(), json!(y.round() as i64));
        }
        if let Some(y) = positive(self.max_build_year) {
            m.insert("max_build_year".into(), json!(y.round() as i64));
        }
        if let Some(f) = positive(self.max_czynsz) {
            m.insert("max_rent_fee".into(), json!(f));
        }

        let kind = match self
            .transaction_type
            .as_deref()
            .map(|t| t.trim().to_ascii_lowercase())
            .as_deref()
        {
            Some("kupno") | Some("sale") | Some("buy") => Some("sale"),
            Some("wynajem") | Some("rent") => Some("rent"),
            _ => None,
        };
        if let Some(k) = kind {
            m.insert("listing_type".into(), json!(k));
        }

        for a in Amenity::ALL {
            if self.amenity(a) == Some(true) {
                m.insert(a.key().into(), Value::Bool(true));
            }
        }
        m
    }

    /// Query filtered by these criteria, ranked against `prompt`.
    pub fn to_query(&self, prompt: &str, limit: usize) -> Result<Query, FilterError> {
        let filters = ListingFilter::from_map(&self.to_filter_map())?;
        Ok(Query::new(filters).with_text(prompt).with_limit(limit))
    }
}

/// JSON schema of the extraction function arguments.
pub fn criteria_schema() -> ExtractionSchema {
    ExtractionSchema {
        name: "extract_search_criteria".into(),
        description: "Extract real-estate search criteria from the user's message. \
            Leave out anything the user did not mention."
            .into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "city": {"type": "string", "description": "City name, e.g. Gdańsk"},
                "district": {"type": "string"},
                "room_count": {"type": "integer", "description": "Number of rooms"},
                "space_sm": {"type": "number", "description": "Minimum area in square meters"},
                "max_price": {"type": "number", "description": "Price ceiling in PLN"},
                "transaction_type": {"type": "string", "enum": ["kupno", "wynajem"]},
                "min_build_year": {"type": "integer"},
                "max_build_year": {"type": "integer"},
                "max_czynsz": {"type": "number", "description": "Monthly administrative fee ceiling"},
                "market_type": {"type": "string", "enum": ["primary", "secondary"]},
                "building_type": {"type": "string"},
                "has_balcony": {"type": "boolean"},
                "has_garage": {"type": "boolean"},
                "has_parking": {"type": "boolean"},
                "has_elevator": {"type": "boolean"},
                "has_air_conditioning": {"type": "boolean"},
                "pets_allowed": {"type": "boolean"},
                "furnished": {"type": "boolean"}
            }
        }),
    }
}

/// Turns a free-text prompt into [`SearchCriteria`].
pub trait CriteriaExtractor: Send + Sync {
    /// `Ok(None)` when the model found nothing to extract.
    fn extract<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SearchCriteria>, ProviderError>> + Send + 'a>>;
}

/// Extractor backed by the chat profile of the shared LLM service.
pub struct LlmCriteriaExtractor {
    svc: Arc<LlmServiceProfiles>,
    schema: ExtractionSchema,
    timeout: Duration,
}

impl LlmCriteriaExtractor {
    pub fn new(svc: Arc<LlmServiceProfiles>) -> Self {
        let timeout = svc
            .profiles()
            .1
            .and_then(|c| c.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(60));
        Self {
            svc,
            schema: criteria_schema(),
            timeout,
        }
    }
}

impl CriteriaExtractor for LlmCriteriaExtractor {
    fn extract<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SearchCriteria>, ProviderError>> + Send + 'a>>
    {
        Box::pin(async move {
            let Some(args) = self
                .svc
                .extract_json(prompt, &self.schema)
                .await
                .map_err(|e| provider_error_from(e, self.timeout))?
            else {
                info!("no criteria extracted from prompt");
                return Ok(None);
            };
            debug!(%args, "criteria arguments");
            serde_json::from_value::<SearchCriteria>(args)
                .map(Some)
                .map_err(|e| ProviderError::Malformed(format!("criteria arguments: {e}")))
        })
    }
}
