//! Result formatter: renders ranked listings into a chat-ready text block.
//!
//! Rendering is pure. A record with an empty title or link is logged and
//! skipped; it never aborts the block.

use std::fmt::Write as _;

use tracing::warn;

use crate::{
    errors::FormatError,
    record::{Listing, ResultRecord, ScoredListing},
    search::SearchOutcome,
};

/// Message returned for an empty result sequence.
pub const NO_RESULTS_MESSAGE: &str =
    "No listings match your criteria. Try widening the price range or removing some filters.";

/// Renders up to `display_cap` results, followed by a `...and N more` notice
/// when the sequence is longer.
pub fn format_results(results: &[ScoredListing], display_cap: usize) -> String {
    render_block(results, results.len(), display_cap)
}

/// Renders a search outcome. The header and the overflow notice count every
/// listing that passed the filters, not only the returned page.
pub fn format_outcome(outcome: &SearchOutcome, display_cap: usize) -> String {
    let total = outcome.candidates.max(outcome.hits.len());
    render_block(&outcome.hits, total, display_cap)
}

fn render_block(results: &[ScoredListing], total: usize, display_cap: usize) -> String {
    if results.is_empty() {
        return NO_RESULTS_MESSAGE.to_string();
    }

    let mut out = format!("Found {total} listings:\n");
    let mut shown = 0usize;

    for r in results.iter().take(display_cap) {
        match render_one(shown + 1, r) {
            Ok(block) => {
                out.push('\n');
                out.push_str(&block);
                shown += 1;
            }
            Err(e) => warn!(error = %e, "skipping malformed result record"),
        }
    }

    let listed = results.len().min(display_cap);
    if total > listed {
        let _ = write!(out, "\n...and {} more", total - listed);
    }

    out.trim_end().to_string()
}

/// Builds serializable records, in order.
pub fn to_records(results: &[ScoredListing]) -> Vec<ResultRecord> {
    results.iter().map(ResultRecord::from).collect()
}

fn render_one(n: usize, r: &ScoredListing) -> Result<String, FormatError> {
    let l: &Listing = &r.listing;
    if l.title.trim().is_empty() {
        return Err(FormatError::MissingField {
            id: l.id.clone(),
            field: "title",
        });
    }
    if l.link.trim().is_empty() {
        return Err(FormatError::MissingField {
            id: l.id.clone(),
            field: "link",
        });
    }

    let mut s = String::new();
    let _ = writeln!(s, "{n}. {}", l.title.trim());
    let _ = writeln!(s, "   💰 {} {}", format_price(l.price), l.currency);
    match l.district.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(d) => {
            let _ = writeln!(s, "   📍 {}, {}", l.city, d);
        }
        None => {
            let _ = writeln!(s, "   📍 {}", l.city);
        }
    }
    let rooms = if l.room_count == 1 { "room" } else { "rooms" };
    let _ = writeln!(s, "   🏠 {} {rooms}, {} m²", l.room_count, l.space_sm);
    if let (Some(score), Some(tier)) = (r.score, r.tier) {
        let _ = writeln!(s, "   {} {} ({score:.3})", tier.glyph(), tier.label());
    }
    let _ = writeln!(s, "   🔗 {}", l.link);
    Ok(s)
}

/// Groups thousands with spaces: `3800` → `3 800`, `1234.5` → `1 234.50`.
pub fn format_price(price: f64) -> String {
    let cents = (price.abs() * 100.0).round() as u64;
    let (whole, frac) = (cents / 100, cents % 100);

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }

    let sign = if price < 0.0 { "-" } else { "" };
    if frac == 0 {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Amenities, ListingType, RelevanceTier};
    use std::sync::Arc;

    fn scored(id: &str, score: Option<f32>) -> ScoredListing {
        ScoredListing {
            listing: Arc::new(Listing {
                id: id.into(),
                title: format!("Flat {id}"),
                price: 3800.0,
                currency: "PLN".into(),
                city: "Gdańsk".into(),
                district: Some("Wrzeszcz".into()),
                neighbourhood: None,
                room_count: 2,
                space_sm: 48.5,
                listing_type: ListingType::Rent,
                link: format!("https://www.otodom.pl/pl/oferta/{id}"),
                description: None,
                market_type: None,
                building_type: None,
                build_year: None,
                rent_fee: None,
                amenities: Amenities::default(),
                embedding: vec![],
            }),
            score,
            tier: score.map(|s| if s < 1.2 { RelevanceTier::High } else { RelevanceTier::Medium }),
        }
    }

    #[test]
    fn empty_input_gives_fixed_message() {
        assert_eq!(format_results(&[], 5), NO_RESULTS_MESSAGE);
    }

    #[test]
    fn overflow_notice_counts_hidden_results() {
        let rs: Vec<_> = (0..5).map(|i| scored(&i.to_string(), None)).collect();
        let text = format_results(&rs, 3);
        assert!(text.starts_with("Found 5 listings:"));
        assert!(text.ends_with("...and 2 more"));
        assert!(text.contains("3. Flat 2"));
        assert!(!text.contains("Flat 3"));
    }

    #[test]
    fn outcome_header_counts_all_candidates() {
        let outcome = SearchOutcome {
            hits: (0..5).map(|i| scored(&i.to_string(), None)).collect(),
            candidates: 8,
            degraded: false,
        };
        let text = format_outcome(&outcome, 5);
        assert!(text.starts_with("Found 8 listings:"));
        assert!(text.contains("5. Flat 4"));
        assert!(text.ends_with("...and 3 more"));

        let empty = SearchOutcome {
            hits: vec![],
            candidates: 0,
            degraded: false,
        };
        assert_eq!(format_outcome(&empty, 5), NO_RESULTS_MESSAGE);
    }

    #[test]
    fn renders_all_segments_for_scored_result() {
        let text = format_results(&[scored("a", Some(1.39))], 5);
        assert!(text.contains("1. Flat a"));
        assert!(text.contains("💰 3 800 PLN"));
        assert!(text.contains("📍 Gdańsk, Wrzeszcz"));
        assert!(text.contains("🏠 2 rooms, 48.5 m²"));
        assert!(text.contains("🟡 Medium relevance (1.390)"));
        assert!(text.contains("🔗 https://www.otodom.pl/pl/oferta/a"));
        assert!(!text.contains("more"));
    }

    #[test]
    fn optional_segments_are_omitted() {
        let mut r = scored("b", None);
        Arc::make_mut(&mut r.listing).district = None;
        let text = format_results(&[r], 5);
        assert!(text.contains("📍 Gdańsk\n"));
        assert!(!text.contains("relevance"));
    }

    #[test]
    fn malformed_record_is_skipped() {
        let mut bad = scored("bad", None);
        Arc::make_mut(&mut bad.listing).link.clear();
        let text = format_results(&[bad, scored("ok", None)], 5);
        assert!(text.starts_with("Found 2 listings:"));
        assert!(text.contains("1. Flat ok"));
        assert!(!text.contains("Flat bad"));
    }

    #[test]
    fn price_grouping() {
        assert_eq!(format_price(3800.0), "3 800");
        assert_eq!(format_price(650_000.0), "650 000");
        assert_eq!(format_price(999.0), "999");
        assert_eq!(format_price(1234.5), "1 234.50");
    }

    #[test]
    fn records_carry_scores() {
        let recs = to_records(&[scored("a", Some(1.0)), scored("b", None)]);
        assert_eq!(recs[0].semantic_score, Some(1.0));
        assert_eq!(recs[0].relevance, Some(RelevanceTier::High));
        assert_eq!(recs[1].semantic_score, None);
        let json = serde_json::to_value(&recs[1]).unwrap();
        assert!(json.get("semantic_score").is_none());
        assert_eq!(json["room_count"], 2);
    }
}
