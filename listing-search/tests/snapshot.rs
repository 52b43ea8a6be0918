use std::{fs, sync::Arc};

use listing_search::{
    HybridSearch, ListingStore, MemoryListingStore, SearchConfig, SearchError, StubEmbedder,
    ingest, read_listings,
};
use tempfile::tempdir;

const RAW: &str = r#"{"title": "Kawalerka przy parku", "description": "Cicha okolica, balkon", "price": 2600, "city": "Gdańsk", "district": "Oliwa", "room_count": 1, "space_sm": 30.5, "transaction_type": "wynajem", "link": "/pl/oferta/kawalerka", "has_balcony": true}
{"title": "Dom z ogrodem", "price": 1250000, "city": "Sopot", "room_count": 5, "space_sm": 180, "listing_type": "sale", "link": "/pl/oferta/dom"}
not json at all
{"title": "Kawalerka przy parku (repost)", "price": 2600, "city": "Gdańsk", "room_count": 1, "space_sm": 30.5, "listing_type": "rent", "link": "https://www.otodom.pl/pl/oferta/kawalerka"}
{"price": 1000, "city": "Gdynia", "room_count": 1, "space_sm": 20, "listing_type": "rent", "link": "/pl/oferta/pusta"}
"#;

#[tokio::test]
async fn populate_writes_a_loadable_snapshot() {
    let dir = tempdir().unwrap();
    let raw = dir.path().join("raw.jsonl");
    let out = dir.path().join("data").join("listings.jsonl");
    fs::write(&raw, RAW).unwrap();

    let cfg = SearchConfig::default();
    let embedder = StubEmbedder::new(16);
    let report = ingest::populate(&raw, &out, &embedder, &cfg).await.unwrap();

    assert_eq!(report.read, 4);
    assert_eq!(report.written, 2);
    assert_eq!(report.embedded, 2);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.skipped_empty, 1);
    assert_eq!(report.dim, Some(16));

    let listings = read_listings(&out, &cfg.link_base).unwrap();
    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0].link, "https://www.otodom.pl/pl/oferta/kawalerka");
    assert!(listings.iter().all(|l| l.embedding.len() == 16));

    let store = MemoryListingStore::from_jsonl(&out, Some(16), &cfg.link_base).unwrap();
    assert_eq!(store.embedding_dim(), Some(16));

    let search = HybridSearch::new(Arc::new(store), Arc::new(embedder), cfg);
    let hits = search
        .semantic_only("Kawalerka przy parku cicha okolica balkon", 1)
        .await
        .unwrap();
    assert_eq!(hits[0].listing.city, "Gdańsk");
}

#[test]
fn snapshot_with_mixed_dimensions_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("listings.jsonl");
    fs::write(
        &path,
        concat!(
            r#"{"id": "a", "title": "A", "price": 1, "city": "Gdańsk", "room_count": 1, "space_sm": 20, "listing_type": "rent", "link": "/a", "embedding": [0.1, 0.2]}"#,
            "\n",
            r#"{"id": "b", "title": "B", "price": 1, "city": "Gdańsk", "room_count": 1, "space_sm": 20, "listing_type": "rent", "link": "/b", "embedding": [0.1, 0.2, 0.3]}"#,
            "\n",
        ),
    )
    .unwrap();

    let err = MemoryListingStore::from_jsonl(&path, None, "https://www.otodom.pl").unwrap_err();
    assert!(matches!(
        err,
        SearchError::VectorSizeMismatch { got: 3, want: 2 }
    ));
}

#[test]
fn snapshot_dimension_must_match_configuration() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("listings.jsonl");
    fs::write(
        &path,
        r#"{"id": "a", "title": "A", "price": 1, "city": "Gdańsk", "room_count": 1, "space_sm": 20, "listing_type": "rent", "link": "/a", "embedding": [0.1, 0.2]}"#,
    )
    .unwrap();

    let err = MemoryListingStore::from_jsonl(&path, Some(64), "https://www.otodom.pl").unwrap_err();
    assert!(matches!(
        err,
        SearchError::VectorSizeMismatch { got: 2, want: 64 }
    ));
}

#[test]
fn broken_snapshot_line_reports_its_number() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("listings.jsonl");
    fs::write(&path, "\n{\"id\": \"a\"}\n").unwrap();

    let err = read_listings(&path, "https://www.otodom.pl").unwrap_err();
    assert!(matches!(err, SearchError::Parse { line: 2, .. }));
}
