//! Filter stage: typed predicates parsed from a JSON mapping.
//!
//! Every specified predicate must hold; unspecified ones impose no constraint.
//! Bounds are inclusive. Parsing is strict on values and lenient on keys:
//! a malformed value is a [`FilterError`], an unknown key is logged and ignored.

use std::{collections::BTreeMap, sync::Arc};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    errors::FilterError,
    record::{Amenity, Listing, ListingType},
};

/// Room-count predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomsPredicate {
    Exact(u32),
    AnyOf(Vec<u32>),
    /// Inclusive range; either bound may be open.
    Range { min: Option<u32>, max: Option<u32> },
}

impl RoomsPredicate {
    pub fn matches(&self, rooms: u32) -> bool {
        match self {
            RoomsPredicate::Exact(n) => rooms == *n,
            RoomsPredicate::AnyOf(set) => set.contains(&rooms),
            RoomsPredicate::Range { min, max } => {
                min.is_none_or(|m| rooms >= m) && max.is_none_or(|m| rooms <= m)
            }
        }
    }
}

/// Typed form of the filter mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    pub city: Option<String>,
    pub district: Option<String>,
    /// `None` means rent and sale.
    pub listing_type: Option<ListingType>,
    pub rooms: Option<RoomsPredicate>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_area: Option<f64>,
    pub max_area: Option<f64>,
    pub min_build_year: Option<i32>,
    pub max_build_year: Option<i32>,
    pub max_rent_fee: Option<f64>,
    pub market_type: Option<String>,
    pub building_type: Option<String>,
    pub amenities: BTreeMap<Amenity, bool>,
}

/// The part of a filter a store can use to pre-select rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoarseFilter {
    pub city: Option<String>,
    pub listing_type: Option<ListingType>,
}

impl CoarseFilter {
    pub fn matches(&self, l: &Listing) -> bool {
        self.city.as_deref().is_none_or(|c| l.city == c)
            && self.listing_type.is_none_or(|t| l.listing_type == t)
    }
}

impl ListingFilter {
    /// `true` when no predicate is set.
    pub fn is_empty(&self) -> bool {
        *self == ListingFilter::default()
    }

    pub fn coarse(&self) -> CoarseFilter {
        CoarseFilter {
            city: self.city.clone(),
            listing_type: self.listing_type,
        }
    }

    /// Parses a filter mapping such as
    /// `{"city": "Gdańsk", "rooms": 2, "max_price": 4000, "listing_type": "rent"}`.
    ///
    /// # Errors
    /// [`FilterError`] for values of the wrong type, negative numbers, unknown
    /// listing types, and ranges whose minimum exceeds the maximum.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, FilterError> {
        let mut f = ListingFilter::default();

        for (key, value) in map {
            match key.as_str() {
                "city" => f.city = string_value(key, value)?,
                "district" => f.district = string_value(key, value)?,
                "market_type" => f.market_type = string_value(key, value)?,
                "building_type" => f.building_type = string_value(key, value)?,
                "listing_type" => f.listing_type = listing_type_value(value)?,
                "rooms" | "room_count" => f.rooms = rooms_value(key, value)?,
                "min_price" => f.min_price = non_negative(key, value)?,
                "max_price" => f.max_price = non_negative(key, value)?,
                "min_area" => f.min_area = non_negative(key, value)?,
                "max_area" => f.max_area = non_negative(key, value)?,
                "min_build_year" | "min_year" => f.min_build_year = year_value(key, value)?,
                "max_build_year" => f.max_build_year = year_value(key, value)?,
                "max_rent_fee" | "max_czynsz" => f.max_rent_fee = non_negative(key, value)?,
                other => match Amenity::from_key(other) {
                    Some(a) => {
                        if let Some(b) = bool_value(key, value)? {
                            f.amenities.insert(a, b);
                        }
                    }
                    None => warn!(key = other, "ignoring unknown filter key"),
                },
            }
        }

        check_range("price", f.min_price, f.max_price)?;
        check_range("area", f.min_area, f.max_area)?;
        check_range(
            "build_year",
            f.min_build_year.map(f64::from),
            f.max_build_year.map(f64::from),
        )?;
        if let Some(RoomsPredicate::Range { min, max }) = &f.rooms {
            check_range("rooms", min.map(f64::from), max.map(f64::from))?;
        }

        debug!(?f, "parsed filter mapping");
        Ok(f)
    }

    /// Whether `l` satisfies every specified predicate.
    pub fn matches(&self, l: &Listing) -> bool {
        eq_opt(&self.city, &l.city)
            && self
                .district
                .as_deref()
                .is_none_or(|d| l.district.as_deref() == Some(d))
            && self.listing_type.is_none_or(|t| l.listing_type == t)
            && self.rooms.as_ref().is_none_or(|r| r.matches(l.room_count))
            && self.min_price.is_none_or(|m| l.price >= m)
            && self.max_price.is_none_or(|m| l.price <= m)
            && self.min_area.is_none_or(|m| l.space_sm >= m)
            && self.max_area.is_none_or(|m| l.space_sm <= m)
            && self
                .min_build_year
                .is_none_or(|y| l.build_year.is_some_and(|b| b >= y))
            && self
                .max_build_year
                .is_none_or(|y| l.build_year.is_some_and(|b| b <= y))
            && self
                .max_rent_fee
                .is_none_or(|m| l.rent_fee.is_some_and(|fee| fee <= m))
            && self
                .market_type
                .as_deref()
                .is_none_or(|m| l.market_type.as_deref() == Some(m))
            && self
                .building_type
                .as_deref()
                .is_none_or(|b| l.building_type.as_deref() == Some(b))
            && self
                .amenities
                .iter()
                .all(|(a, want)| a.value_in(&l.amenities) == Some(*want))
    }
}

/// Returns the listings satisfying `filter`, preserving input order.
pub fn apply(listings: &[Arc<Listing>], filter: &ListingFilter) -> Vec<Arc<Listing>> {
    if filter.is_empty() {
        return listings.to_vec();
    }
    listings
        .iter()
        .filter(|l| filter.matches(l))
        .cloned()
        .collect()
}

fn eq_opt(want: &Option<String>, have: &str) -> bool {
    want.as_deref().is_none_or(|w| w == have)
}

fn invalid(key: &str, expected: &'static str, got: &Value) -> FilterError {
    FilterError::InvalidValue {
        key: key.to_string(),
        expected,
        got: got.to_string(),
    }
}

fn string_value(key: &str, v: &Value) -> Result<Option<String>, FilterError> {
    match v {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.trim().to_string())),
        other => Err(invalid(key, "a string", other)),
    }
}

fn listing_type_value(v: &Value) -> Result<Option<ListingType>, FilterError> {
    match v {
        Value::Null => Ok(None),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "" | "both" | "all" | "any" => Ok(None),
            other => other.parse().map(Some),
        },
        other => Err(invalid("listing_type", "rent, sale or both", other)),
    }
}

fn number_value(key: &str, v: &Value) -> Result<Option<f64>, FilterError> {
    let n = match v {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        Some(x) if x.is_finite() => Ok(Some(x)),
        _ => Err(invalid(key, "a number", v)),
    }
}

fn non_negative(key: &str, v: &Value) -> Result<Option<f64>, FilterError> {
    match number_value(key, v)? {
        Some(x) if x < 0.0 => Err(FilterError::Negative {
            key: key.to_string(),
        }),
        other => Ok(other),
    }
}

fn whole_number(key: &str, v: &Value) -> Result<Option<i64>, FilterError> {
    match number_value(key, v)? {
        Some(x) if x.fract() != 0.0 => Err(invalid(key, "a whole number", v)),
        Some(x) => Ok(Some(x as i64)),
        None => Ok(None),
    }
}

fn room_number(key: &str, v: &Value) -> Result<Option<u32>, FilterError> {
    match whole_number(key, v)? {
        Some(n) if n < 0 => Err(FilterError::Negative {
            key: key.to_string(),
        }),
        Some(n) => u32::try_from(n)
            .map(Some)
            .map_err(|_| invalid(key, "a room count", v)),
        None => Ok(None),
    }
}

fn year_value(key: &str, v: &Value) -> Result<Option<i32>, FilterError> {
    match whole_number(key, v)? {
        Some(n) => i32::try_from(n)
            .map(Some)
            .map_err(|_| invalid(key, "a year", v)),
        None => Ok(None),
    }
}

fn rooms_value(key: &str, v: &Value) -> Result<Option<RoomsPredicate>, FilterError> {
    match v {
        Value::Null => Ok(None),
        Value::Array(items) => {
            let mut set = Vec::with_capacity(items.len());
            for item in items {
                match room_number(key, item)? {
                    Some(n) => set.push(n),
                    None => return Err(invalid(key, "an array of room counts", v)),
                }
            }
            Ok(Some(RoomsPredicate::AnyOf(set)))
        }
        Value::Object(obj) => {
            for k in obj.keys() {
                if k != "min" && k != "max" {
                    return Err(invalid(key, "an object with `min`/`max`", v));
                }
            }
            let min = obj
                .get("min")
                .map(|m| room_number(key, m))
                .transpose()?
                .flatten();
            let max = obj
                .get("max")
                .map(|m| room_number(key, m))
                .transpose()?
                .flatten();
            Ok(Some(RoomsPredicate::Range { min, max }))
        }
        other => Ok(room_number(key, other)?.map(RoomsPredicate::Exact)),
    }
}

fn bool_value(key: &str, v: &Value) -> Result<Option<bool>, FilterError> {
    match v {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Some(true)),
            "false" | "no" | "0" => Ok(Some(false)),
            _ => Err(invalid(key, "a boolean", v)),
        },
        other => Err(invalid(key, "a boolean", other)),
    }
}

fn check_range(key: &'static str, min: Option<f64>, max: Option<f64>) -> Result<(), FilterError> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err(FilterError::EmptyRange { key, min, max }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Amenities;
    use serde_json::json;

    fn listing(id: &str, city: &str, rooms: u32, price: f64, kind: ListingType) -> Arc<Listing> {
        Arc::new(Listing {
            id: id.into(),
            title: format!("Listing {id}"),
            price,
            currency: "PLN".into(),
            city: city.into(),
            district: None,
            neighbourhood: None,
            room_count: rooms,
            space_sm: 40.0 + rooms as f64 * 10.0,
            listing_type: kind,
            link: format!("https://www.otodom.pl/pl/oferta/{id}"),
            description: None,
            market_type: None,
            building_type: None,
            build_year: None,
            rent_fee: None,
            amenities: Amenities::default(),
            embedding: vec![],
        })
    }

    fn parse(v: Value) -> Result<ListingFilter, FilterError> {
        match v {
            Value::Object(m) => ListingFilter::from_map(&m),
            _ => unreachable!("test filters are objects"),
        }
    }

    fn fixture() -> Vec<Arc<Listing>> {
        vec![
            listing("a", "Gdańsk", 2, 3800.0, ListingType::Rent),
            listing("b", "Gdynia", 2, 3500.0, ListingType::Rent),
            listing("c", "Gdańsk", 3, 4000.0, ListingType::Rent),
            listing("d", "Gdańsk", 2, 4500.0, ListingType::Rent),
            listing("e", "Gdańsk", 2, 650_000.0, ListingType::Sale),
            listing("f", "Sopot", 1, 2900.0, ListingType::Rent),
        ]
    }

    fn ids(v: &[Arc<Listing>]) -> Vec<&str> {
        v.iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn empty_filter_returns_input_in_order() {
        let all = fixture();
        let out = apply(&all, &ListingFilter::default());
        assert_eq!(ids(&out), ids(&all));
        assert!(parse(json!({"city": null, "listing_type": "both"})).unwrap().is_empty());
    }

    #[test]
    fn output_is_exactly_the_matching_subset() {
        let all = fixture();
        let f = parse(json!({
            "city": "Gdańsk", "rooms": 2, "max_price": 4000, "listing_type": "rent"
        }))
        .unwrap();
        let out = apply(&all, &f);
        assert_eq!(ids(&out), vec!["a"]);

        for l in &all {
            assert_eq!(f.matches(l), out.iter().any(|o| o.id == l.id), "{}", l.id);
        }
    }

    #[test]
    fn price_ceiling_is_inclusive() {
        let f = parse(json!({"max_price": 4000, "city": "Gdańsk", "listing_type": "rent"})).unwrap();
        assert_eq!(ids(&apply(&fixture(), &f)), vec!["a", "c"]);
    }

    #[test]
    fn rooms_accepts_int_list_and_range() {
        let all = fixture();
        let set = parse(json!({"rooms": [1, 3]})).unwrap();
        assert_eq!(ids(&apply(&all, &set)), vec!["c", "f"]);

        let range = parse(json!({"room_count": {"min": 2, "max": 3}, "city": "Gdynia"})).unwrap();
        assert_eq!(ids(&apply(&all, &range)), vec!["b"]);

        let open = parse(json!({"rooms": {"min": 3}})).unwrap();
        assert_eq!(ids(&apply(&all, &open)), vec!["c"]);
    }

    #[test]
    fn no_match_is_empty_not_error() {
        let f = parse(json!({"city": "Kraków"})).unwrap();
        assert!(apply(&fixture(), &f).is_empty());
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let f = parse(json!({"max_price": "4000", "rooms": "2"})).unwrap();
        assert_eq!(f.max_price, Some(4000.0));
        assert_eq!(f.rooms, Some(RoomsPredicate::Exact(2)));
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(matches!(
            parse(json!({"max_price": "cheap"})),
            Err(FilterError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse(json!({"rooms": -1})),
            Err(FilterError::Negative { .. })
        ));
        assert!(matches!(
            parse(json!({"rooms": 2.5})),
            Err(FilterError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse(json!({"listing_type": "lease"})),
            Err(FilterError::UnknownListingType(_))
        ));
        assert!(matches!(
            parse(json!({"min_price": 5000, "max_price": 4000})),
            Err(FilterError::EmptyRange { key: "price", .. })
        ));
        assert!(matches!(
            parse(json!({"has_balcony": 3})),
            Err(FilterError::InvalidValue { .. })
        ));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let f = parse(json!({"street": "Długa", "city": "Gdańsk"})).unwrap();
        assert_eq!(f.city.as_deref(), Some("Gdańsk"));
    }

    #[test]
    fn optional_attributes_follow_their_rules() {
        let mut with_fee = (*listing("g", "Gdańsk", 2, 3000.0, ListingType::Rent)).clone();
        with_fee.rent_fee = Some(600.0);
        with_fee.build_year = Some(2015);
        with_fee.district = Some("Wrzeszcz".into());
        with_fee.amenities.has_balcony = Some(true);
        let with_fee = Arc::new(with_fee);
        let bare = listing("h", "Gdańsk", 2, 3000.0, ListingType::Rent);

        let fee = parse(json!({"max_czynsz": 500})).unwrap();
        assert!(!fee.matches(&with_fee));
        assert!(!fee.matches(&bare), "unknown fee fails");
        let generous = parse(json!({"max_czynsz": 600})).unwrap();
        assert!(generous.matches(&with_fee));

        let year = parse(json!({"min_build_year": 2010})).unwrap();
        assert!(year.matches(&with_fee));
        assert!(!year.matches(&bare), "unknown build year fails");

        let short_key = parse(json!({"min_year": "2016"})).unwrap();
        assert_eq!(short_key.min_build_year, Some(2016));
        assert!(!short_key.matches(&with_fee));

        let district = parse(json!({"district": "Wrzeszcz"})).unwrap();
        assert!(district.matches(&with_fee));
        assert!(!district.matches(&bare));

        let balcony = parse(json!({"has_balcony": true})).unwrap();
        assert!(balcony.matches(&with_fee));
        assert!(!balcony.matches(&bare), "unknown amenity does not match");
    }
}
