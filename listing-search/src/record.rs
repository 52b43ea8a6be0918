//! Core data model: listings, queries and scored results.

use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{errors::FilterError, filters::ListingFilter};

/// Default number of results returned by a query.
pub const DEFAULT_LIMIT: usize = 5;

/// Currency assumed when a row does not carry one.
pub const DEFAULT_CURRENCY: &str = "PLN";

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// Rent or sale offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Rent,
    Sale,
}

impl ListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingType::Rent => "rent",
            ListingType::Sale => "sale",
        }
    }
}

impl fmt::Display for ListingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingType {
    type Err = FilterError;

    /// Accepts English names and the Polish `wynajem`/`kupno` used by the source site.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rent" | "wynajem" => Ok(ListingType::Rent),
            "sale" | "kupno" | "sprzedaz" => Ok(ListingType::Sale),
            other => Err(FilterError::UnknownListingType(other.to_string())),
        }
    }
}

/// Optional boolean features of a listing. `None` means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amenities {
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

/// One boolean feature, addressable by its filter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Amenity {
    Balcony,
    Garage,
    Parking,
    Elevator,
    AirConditioning,
    PetsAllowed,
    Furnished,
}

impl Amenity {
    pub const ALL: [Amenity; 7] = [
        Amenity::Balcony,
        Amenity::Garage,
        Amenity::Parking,
        Amenity::Elevator,
        Amenity::AirConditioning,
        Amenity::PetsAllowed,
        Amenity::Furnished,
    ];

    /// Field name in listing rows and filter mappings.
    pub fn key(&self) -> &'static str {
        match self {
            Amenity::Balcony => "has_balcony",
            Amenity::Garage => "has_garage",
            Amenity::Parking => "has_parking",
            Amenity::Elevator => "has_elevator",
            Amenity::AirConditioning => "has_air_conditioning",
            Amenity::PetsAllowed => "pets_allowed",
            Amenity::Furnished => "furnished",
        }
    }

    /// Human label used in embedding texts.
    pub fn label(&self) -> &'static str {
        match self {
            Amenity::Balcony => "balcony",
            Amenity::Garage => "garage",
            Amenity::Parking => "parking",
            Amenity::Elevator => "elevator",
            Amenity::AirConditioning => "air conditioning",
            Amenity::PetsAllowed => "pets allowed",
            Amenity::Furnished => "furnished",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.key() == key)
    }

    pub fn value_in(&self, a: &Amenities) -> Option<bool> {
        match self {
            Amenity::Balcony => a.has_balcony,
            Amenity::Garage => a.has_garage,
            Amenity::Parking => a.has_parking,
            Amenity::Elevator => a.has_elevator,
            Amenity::AirConditioning => a.has_air_conditioning,
            Amenity::PetsAllowed => a.pets_allowed,
            Amenity::Furnished => a.furnished,
        }
    }
}

/// Immutable listing with its precomputed embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighbourhood: Option<String>,
    pub room_count: u32,
    pub space_sm: f64,
    pub listing_type: ListingType,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_year: Option<i32>,
    /// Monthly administrative fee ("czynsz").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rent_fee: Option<f64>,
    #[serde(flatten)]
    pub amenities: Amenities,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

/// A search request: structured filters, optional free text and a result cap.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub filters: ListingFilter,
    pub text: Option<String>,
    pub limit: usize,
}

impl Query {
    pub fn new(filters: ListingFilter) -> Self {
        Self {
            filters,
            text: None,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Sets the semantic text; blank strings count as absent.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text = (!text.trim().is_empty()).then_some(text);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::new(ListingFilter::default())
    }
}

/// Coarse relevance bucket derived from a semantic score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelevanceTier {
    High,
    Medium,
    Low,
}

impl RelevanceTier {
    pub fn label(&self) -> &'static str {
        match self {
            RelevanceTier::High => "High relevance",
            RelevanceTier::Medium => "Medium relevance",
            RelevanceTier::Low => "Low relevance",
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            RelevanceTier::High => "🟢",
            RelevanceTier::Medium => "🟡",
            RelevanceTier::Low => "🔴",
        }
    }
}

/// Listing paired with its distance score (lower is closer) and tier.
///
/// Both are `None` when no semantic ranking was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredListing {
    pub listing: Arc<Listing>,
    pub score: Option<f32>,
    pub tier: Option<RelevanceTier>,
}

impl ScoredListing {
    pub fn unscored(listing: Arc<Listing>) -> Self {
        Self {
            listing,
            score: None,
            tier: None,
        }
    }
}

/// Serializable result record handed to API consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: String,
    pub title: String,
    pub price: f64,
    pub currency: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    pub room_count: u32,
    pub space_sm: f64,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<RelevanceTier>,
}

impl From<&ScoredListing> for ResultRecord {
    fn from(s: &ScoredListing) -> Self {
        let l = &s.listing;
        Self {
            id: l.id.clone(),
            title: l.title.clone(),
            price: l.price,
            currency: l.currency.clone(),
            city: l.city.clone(),
            district: l.district.clone(),
            room_count: l.room_count,
            space_sm: l.space_sm,
            link: l.link.clone(),
            semantic_score: s.score,
            relevance: s.tier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn listing_row_fills_defaults_and_flattens_amenities() {
        let row = json!({
            "id": "a1",
            "title": "2 pokoje, Wrzeszcz",
            "price": 3800,
            "city": "Gdańsk",
            "room_count": 2,
            "space_sm": 48.5,
            "listing_type": "rent",
            "link": "https://www.otodom.pl/pl/oferta/a1",
            "has_balcony": true,
            "embedding": [0.1, 0.2]
        });
        let l: Listing = serde_json::from_value(row).unwrap();
        assert_eq!(l.currency, "PLN");
        assert_eq!(l.amenities.has_balcony, Some(true));
        assert_eq!(l.amenities.has_garage, None);
        assert_eq!(l.listing_type, ListingType::Rent);
    }

    #[test]
    fn listing_type_accepts_polish_names() {
        assert_eq!("kupno".parse::<ListingType>().unwrap(), ListingType::Sale);
        assert_eq!("Wynajem".parse::<ListingType>().unwrap(), ListingType::Rent);
        assert!("lease".parse::<ListingType>().is_err());
    }

    #[test]
    fn blank_text_is_absent() {
        assert_eq!(Query::default().with_text("   ").text, None);
        assert_eq!(Query::default().limit, DEFAULT_LIMIT);
    }
}
