//! Default run: a filter-only query followed by the same query ranked by text.

use anyhow::Context;
use colored::Colorize;
use listing_search::{
    EmbeddingsProvider, HybridSearch, IngestReport, MemoryListingStore, SearchConfig,
    SearchOutcome, format_outcome, ingest,
};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

/// Scraper-shaped sample used when no snapshot exists yet.
const RAW_FIXTURE: &str = include_str!("../data/raw_listings.jsonl");

const DEMO_TEXT: &str = "cicha okolica z balkonem";

/// Builds an in-memory store from the bundled sample.
///
/// Listings stay unembedded when the provider fails, so the demo still runs
/// in filter-only mode.
pub async fn sample_store(
    embedder: &dyn EmbeddingsProvider,
    cfg: &SearchConfig,
) -> anyhow::Result<MemoryListingStore> {
    let rows = RAW_FIXTURE
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(serde_json::from_str::<Value>)
        .collect::<Result<Vec<_>, _>>()
        .context("bundled sample is not valid JSONL")?;

    let mut report = IngestReport::default();
    let prepared = ingest::prepare(rows, &cfg.link_base, &mut report);
    let mut embedded = prepared.clone();
    let listings = match ingest::embed_listings(&mut embedded, embedder, cfg, &mut report).await {
        Ok(()) => embedded,
        Err(e) => {
            warn!(error = %e, "sample listings left unembedded");
            prepared
        }
    };
    info!(listings = listings.len(), "sample store built");
    Ok(MemoryListingStore::new(listings, None)?)
}

fn demo_filters() -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("city".into(), json!("Gdańsk"));
    m.insert("rooms".into(), json!(2));
    m.insert("max_price".into(), json!(4000));
    m.insert("listing_type".into(), json!("rent"));
    m
}

fn print_block(title: &str, outcome: &SearchOutcome, cap: usize) {
    println!("{}", title.bold());
    if outcome.degraded {
        println!("{}", "(semantic ranking unavailable, filter-only order)".yellow());
    }
    println!("{}\n", format_outcome(outcome, cap));
}

pub async fn run(search: &HybridSearch) -> anyhow::Result<()> {
    let filters = demo_filters();
    let cap = search.config().display_cap;

    let plain = search.search_map(&filters, None, None).await?;
    print_block(
        "Gdańsk, 2 rooms, up to 4000 PLN, for rent:",
        &plain,
        cap,
    );

    let ranked = search.search_map(&filters, Some(DEMO_TEXT), None).await?;
    print_block(&format!("Same filters ranked by \"{DEMO_TEXT}\":"), &ranked, cap);
    Ok(())
}
