//! Snapshot population: raw scraped rows → embedded listing snapshot.
//!
//! Pipeline:
//! 1. read raw JSONL tolerantly
//! 2. normalize rows into [`Listing`]s (skip rows without text or required fields)
//! 3. assign stable ids from the link, drop duplicate ids
//! 4. embed listings lacking a vector (bounded concurrency, progress bar)
//! 5. enforce one dimension and write the snapshot

use std::{collections::HashSet, path::Path};

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    config::SearchConfig,
    embed::EmbeddingsProvider,
    errors::SearchError,
    io_jsonl::{canonicalize_link, read_all_jsonl, write_listings},
    record::{Amenities, Amenity, DEFAULT_CURRENCY, Listing, ListingType},
    retry::retry_transient,
};

/// Counters reported after a populate run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub read: usize,
    pub skipped_empty: usize,
    pub skipped_invalid: usize,
    pub duplicates: usize,
    pub embedded: usize,
    pub reused: usize,
    pub written: usize,
    pub dim: Option<usize>,
}

/// Row shape produced by the scraper. Everything is optional here; required
/// fields are checked in [`normalize`].
#[derive(Debug, Deserialize)]
struct RawListing {
    #[serde(default, alias = "_id")]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "features_by_category")]
    features: Option<Value>,
    #[serde(default, deserialize_with = "lenient_f64")]
    price: Option<f64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    district: Option<String>,
    #[serde(default)]
    neighbourhood: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    room_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient_f64")]
    space_sm: Option<f64>,
    #[serde(default, alias = "transaction_type")]
    listing_type: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    market_type: Option<String>,
    #[serde(default)]
    building_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_i32")]
    build_year: Option<i32>,
    #[serde(default, alias = "czynsz", deserialize_with = "lenient_f64")]
    rent_fee: Option<f64>,
    #[serde(flatten)]
    amenities: Amenities,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

/// Number from a scraped value. Strings such as `"2012"`, `"3 800 zł"` or
/// `"+ czynsz: 490 zł/miesiąc"` yield their first numeric run; anything
/// unparsable is `None` rather than a decode error.
fn scraped_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let compact: String = s
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(|c| if c == ',' { '.' } else { c })
                .collect();
            let start = compact.find(|c: char| c.is_ascii_digit())?;
            let run: String = compact[start..]
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            run.trim_end_matches('.').parse().ok()
        }
        _ => None,
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?
        .as_ref()
        .and_then(scraped_number))
}

fn whole_number(d: Option<Value>, min: f64, max: f64) -> Option<f64> {
    d.as_ref()
        .and_then(scraped_number)
        .filter(|n| n.fract() == 0.0 && (min..=max).contains(n))
}

fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(whole_number(v, 0.0, f64::from(u32::MAX)).map(|n| n as u32))
}

fn lenient_i32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(whole_number(v, f64::from(i32::MIN), f64::from(i32::MAX)).map(|n| n as i32))
}

enum Skip {
    Empty,
    Invalid(&'static str),
}

/// Stable id derived from a listing link.
pub fn id_from_link(link: &str) -> String {
    blake3::hash(link.trim().as_bytes()).to_hex()[..32].to_string()
}

/// Text embedded for a listing: title, description, features and location lines.
pub fn listing_embedding_text(l: &Listing) -> String {
    let mut parts = Vec::with_capacity(4);
    if !l.title.trim().is_empty() {
        parts.push(format!("Title: {}", l.title.trim()));
    }
    if let Some(d) = l.description.as_deref().filter(|d| !d.trim().is_empty()) {
        parts.push(format!("Description: {}", d.trim()));
    }

    let mut features = vec![
        format!("{} rooms", l.room_count),
        format!("{} m²", l.space_sm),
        format!("for {}", l.listing_type),
    ];
    features.extend(l.market_type.iter().map(|m| format!("{m} market")));
    features.extend(l.building_type.iter().cloned());
    features.extend(l.build_year.iter().map(|y| format!("built {y}")));
    features.extend(
        Amenity::ALL
            .iter()
            .filter(|a| a.value_in(&l.amenities) == Some(true))
            .map(|a| a.label().to_string()),
    );
    parts.push(format!("Features: {}", features.join(", ")));

    let location: Vec<&str> = std::iter::once(l.city.as_str())
        .chain(l.district.as_deref())
        .chain(l.neighbourhood.as_deref())
        .filter(|s| !s.trim().is_empty())
        .collect();
    if !location.is_empty() {
        parts.push(format!("Location: {}", location.join(", ")));
    }

    parts.join("\n")
}

fn features_text(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(features_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => map
            .iter()
            .filter_map(|(k, v)| features_text(v).map(|t| format!("{k}: {t}")))
            .collect::<Vec<_>>()
            .join("; "),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    (!s.is_empty()).then_some(s)
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn normalize(raw: RawListing, link_base: &str) -> Result<Listing, Skip> {
    let title = non_blank(raw.title);
    let mut description = non_blank(raw.description);
    if let Some(f) = raw.features.as_ref().and_then(features_text) {
        description = Some(match description {
            Some(d) => format!("{d}\n{f}"),
            None => f,
        });
    }
    let title = match (title, &description) {
        (Some(t), _) => t,
        (None, Some(d)) => d.chars().take(80).collect(),
        (None, None) => return Err(Skip::Empty),
    };

    let link = non_blank(raw.link).ok_or(Skip::Invalid("link"))?;
    let link = canonicalize_link(&link, link_base);
    let city = non_blank(raw.city).ok_or(Skip::Invalid("city"))?;
    let price = raw.price.filter(|p| *p >= 0.0).ok_or(Skip::Invalid("price"))?;
    let space_sm = raw
        .space_sm
        .filter(|a| *a > 0.0)
        .ok_or(Skip::Invalid("space_sm"))?;
    let room_count = raw.room_count.ok_or(Skip::Invalid("room_count"))?;
    let listing_type = raw
        .listing_type
        .as_deref()
        .and_then(|t| t.parse::<ListingType>().ok())
        .ok_or(Skip::Invalid("listing_type"))?;

    Ok(Listing {
        id: non_blank(raw.id).unwrap_or_else(|| id_from_link(&link)),
        title,
        price,
        currency: non_blank(raw.currency).unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        city,
        district: non_blank(raw.district),
        neighbourhood: non_blank(raw.neighbourhood),
        room_count,
        space_sm,
        listing_type,
        link,
        description,
        market_type: non_blank(raw.market_type),
        building_type: non_blank(raw.building_type),
        build_year: raw.build_year,
        rent_fee: raw.rent_fee,
        amenities: raw.amenities,
        embedding: raw.embedding.unwrap_or_default(),
    })
}

/// Normalizes raw rows, skipping empty/invalid ones and duplicate ids.
pub fn prepare(rows: Vec<Value>, link_base: &str, report: &mut IngestReport) -> Vec<Listing> {
    report.read += rows.len();
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(rows.len());

    for (i, row) in rows.into_iter().enumerate() {
        let raw: RawListing = match serde_json::from_value(row) {
            Ok(r) => r,
            Err(e) => {
                warn!(row = i + 1, error = %e, "skipping undecodable listing row");
                report.skipped_invalid += 1;
                continue;
            }
        };
        match normalize(raw, link_base) {
            Ok(l) => {
                if seen.insert(l.id.clone()) {
                    out.push(l);
                } else {
                    debug!(id = %l.id, "duplicate listing skipped");
                    report.duplicates += 1;
                }
            }
            Err(Skip::Empty) => report.skipped_empty += 1,
            Err(Skip::Invalid(field)) => {
                warn!(row = i + 1, field, "skipping listing with missing or invalid field");
                report.skipped_invalid += 1;
            }
        }
    }
    out
}

/// Embeds listings without a vector and enforces a single dimension.
///
/// # Errors
/// - [`SearchError::Provider`] when an embedding fails after retries
/// - [`SearchError::VectorSizeMismatch`] when vector lengths disagree
pub async fn embed_listings(
    listings: &mut [Listing],
    provider: &dyn EmbeddingsProvider,
    cfg: &SearchConfig,
    report: &mut IngestReport,
) -> Result<(), SearchError> {
    let idxs: Vec<usize> = listings
        .iter()
        .enumerate()
        .filter_map(|(i, l)| l.embedding.is_empty().then_some(i))
        .collect();
    report.reused += listings.len() - idxs.len();

    info!(
        total = listings.len(),
        to_embed = idxs.len(),
        concurrency = cfg.ingest_concurrency,
        provider = provider.name(),
        "embedding listings"
    );

    if !idxs.is_empty() {
        let pb = ProgressBar::new(idxs.len() as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
        ) {
            pb.set_style(style.progress_chars("##-"));
        }

        let texts: Vec<(usize, String)> = idxs
            .into_iter()
            .map(|i| (i, listing_embedding_text(&listings[i])))
            .collect();

        let results: Vec<(usize, Vec<f32>)> = stream::iter(texts)
            .map(|(i, text)| {
                let pb = &pb;
                async move {
                    let v = retry_transient(&cfg.retry, "embed listing", || provider.embed(&text))
                        .await?;
                    pb.inc(1);
                    Ok::<(usize, Vec<f32>), SearchError>((i, v))
                }
            })
            .buffer_unordered(cfg.ingest_concurrency.max(1))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>, SearchError>>()?;

        pb.finish_with_message("embedding complete ✔");
        report.embedded += results.len();
        for (i, v) in results {
            listings[i].embedding = v;
        }
    }

    let want = cfg
        .embedding_dim
        .or_else(|| listings.first().map(|l| l.embedding.len()));
    if let Some(want) = want {
        if let Some(bad) = listings.iter().find(|l| l.embedding.len() != want) {
            return Err(SearchError::VectorSizeMismatch {
                got: bad.embedding.len(),
                want,
            });
        }
    }
    report.dim = want;
    Ok(())
}

/// Full populate run: raw JSONL in, embedded snapshot out.
pub async fn populate(
    raw_path: impl AsRef<Path>,
    out_path: impl AsRef<Path>,
    provider: &dyn EmbeddingsProvider,
    cfg: &SearchConfig,
) -> Result<IngestReport, SearchError> {
    let mut report = IngestReport::default();
    let rows = read_all_jsonl(raw_path.as_ref())?;
    let mut listings = prepare(rows, &cfg.link_base, &mut report);
    embed_listings(&mut listings, provider, cfg, &mut report).await?;
    write_listings(out_path.as_ref(), &listings)?;
    report.written = listings.len();

    info!(
        read = report.read,
        written = report.written,
        embedded = report.embedded,
        reused = report.reused,
        duplicates = report.duplicates,
        skipped_empty = report.skipped_empty,
        skipped_invalid = report.skipped_invalid,
        dim = ?report.dim,
        distance = %cfg.distance,
        "populate finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rows_are_normalized_deduplicated_and_filtered() {
        let rows = vec![
            json!({"title": "2 pokoje", "price": 3800, "city": "Gdańsk", "room_count": 2,
                   "space_sm": 48.0, "transaction_type": "wynajem", "link": "/pl/oferta/a"}),
            json!({"title": "2 pokoje (dup)", "price": 3800, "city": "Gdańsk", "room_count": 2,
                   "space_sm": 48.0, "listing_type": "rent",
                   "link": "https://www.otodom.pl/pl/oferta/a"}),
            json!({"price": 100, "city": "Gdańsk", "room_count": 1, "space_sm": 20.0,
                   "listing_type": "rent", "link": "/pl/oferta/empty"}),
            json!({"title": "no link", "price": 1, "city": "Sopot", "room_count": 1,
                   "space_sm": 20.0, "listing_type": "rent"}),
            json!({"description": "Przestronne mieszkanie blisko morza", "price": 500000,
                   "city": "Gdynia", "room_count": 3, "space_sm": 70.0,
                   "listing_type": "kupno", "link": "/pl/oferta/b", "czynsz": 700}),
        ];
        let mut report = IngestReport::default();
        let out = prepare(rows, "https://www.otodom.pl", &mut report);

        assert_eq!(out.len(), 2);
        assert_eq!(report.read, 5);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.skipped_empty, 1);
        assert_eq!(report.skipped_invalid, 1);

        assert_eq!(out[0].link, "https://www.otodom.pl/pl/oferta/a");
        assert_eq!(out[0].id, id_from_link("https://www.otodom.pl/pl/oferta/a"));
        assert_eq!(out[0].listing_type, ListingType::Rent);
        assert_eq!(out[1].listing_type, ListingType::Sale);
        assert_eq!(out[1].title, "Przestronne mieszkanie blisko morza");
        assert_eq!(out[1].rent_fee, Some(700.0));
    }

    #[test]
    fn stringly_scraper_numbers_are_parsed_or_dropped() {
        let rows = vec![
            json!({"title": "Po remoncie", "price": "3 800 zł", "city": "Gdańsk",
                   "room_count": "2 pokoje", "space_sm": "48,5 m²", "listing_type": "rent",
                   "link": "/pl/oferta/s", "build_year": "2012",
                   "czynsz": "+ czynsz: 550 zł/miesiąc"}),
            json!({"title": "Bez roku", "price": 3100, "city": "Gdańsk", "room_count": 1,
                   "space_sm": 30.0, "listing_type": "rent", "link": "/pl/oferta/t",
                   "build_year": "brak danych", "czynsz": "N/A"}),
        ];
        let mut report = IngestReport::default();
        let out = prepare(rows, "https://www.otodom.pl", &mut report);

        assert_eq!(out.len(), 2, "{report:?}");
        assert_eq!(report.skipped_invalid, 0);

        assert_eq!(out[0].build_year, Some(2012));
        assert_eq!(out[0].price, 3800.0);
        assert_eq!(out[0].room_count, 2);
        assert_eq!(out[0].space_sm, 48.5);
        assert_eq!(out[0].rent_fee, Some(550.0));

        assert_eq!(out[1].build_year, None);
        assert_eq!(out[1].rent_fee, None);
    }

    #[test]
    fn embedding_text_has_all_sections() {
        let rows = vec![json!({
            "title": "Cichy apartament", "description": "Balkon od strony parku",
            "price": 3900, "city": "Gdańsk", "district": "Oliwa", "room_count": 2,
            "space_sm": 52.0, "listing_type": "rent", "link": "/x", "has_balcony": true
        })];
        let out = prepare(rows, "https://www.otodom.pl", &mut IngestReport::default());
        let text = listing_embedding_text(&out[0]);
        assert!(text.starts_with("Title: Cichy apartament\n"));
        assert!(text.contains("Description: Balkon od strony parku"));
        assert!(text.contains("Features: 2 rooms, 52 m², for rent, balcony"));
        assert!(text.ends_with("Location: Gdańsk, Oliwa"));
    }
}
