use std::{future::Future, pin::Pin, sync::Arc};

use api::{core::app_state::AppState, router};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use listing_search::{
    CriteriaExtractor, DistanceMetric, EmbeddingsProvider, HybridSearch, Listing,
    MemoryListingStore, ProviderError, SearchConfig, SearchCriteria,
};
use llm_provider::LlmServiceProfiles;
use serde_json::{Value, json};
use tower::ServiceExt;

struct OriginEmbedder;

impl EmbeddingsProvider for OriginEmbedder {
    fn embed<'a>(
        &'a self,
        _text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, ProviderError>> + Send + 'a>> {
        Box::pin(async { Ok(vec![0.0, 0.0]) })
    }

    fn name(&self) -> &str {
        "origin"
    }
}

struct CannedExtractor(Result<Option<SearchCriteria>, ProviderError>);

impl CriteriaExtractor for CannedExtractor {
    fn extract<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SearchCriteria>, ProviderError>> + Send + 'a>>
    {
        let out = self.0.clone();
        Box::pin(async move { out })
    }
}

fn listing(id: &str, city: &str, price: f64, emb: [f32; 2]) -> Listing {
    serde_json::from_value(json!({
        "id": id,
        "title": format!("Mieszkanie {id}"),
        "price": price,
        "city": city,
        "room_count": 2,
        "space_sm": 50.0,
        "listing_type": "rent",
        "link": format!("https://www.otodom.pl/pl/oferta/{id}"),
        "embedding": emb,
    }))
    .unwrap()
}

fn app(extractor: Option<Arc<dyn CriteriaExtractor>>) -> Router {
    let store = MemoryListingStore::new(
        vec![
            listing("far", "Gdańsk", 3900.0, [0.0, 1.42]),
            listing("pricey", "Gdańsk", 4500.0, [0.0, 0.1]),
            listing("near", "Gdańsk", 3700.0, [1.39, 0.0]),
            listing("sopot", "Sopot", 3000.0, [0.0, 0.0]),
        ],
        None,
    )
    .unwrap();
    let cfg = SearchConfig {
        distance: DistanceMetric::Euclid,
        ..SearchConfig::default()
    };
    let search = Arc::new(HybridSearch::new(
        Arc::new(store),
        Arc::new(OriginEmbedder),
        cfg,
    ));
    let llm = Arc::new(LlmServiceProfiles::new(None, None, Some(1)).unwrap());
    router(Arc::new(AppState::new(search, llm, extractor)))
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn result_ids(body: &Value) -> Vec<&str> {
    body["data"]["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn search_filters_and_ranks() {
    let (status, body) = call(
        app(None),
        post(
            "/search",
            json!({
                "filters": {"city": "Gdańsk", "rooms": 2, "max_price": 4000},
                "query": "cicha okolica z balkonem"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(result_ids(&body), vec!["near", "far"]);
    assert_eq!(body["data"]["degraded"], false);
    assert_eq!(body["data"]["results"][0]["relevance"], "medium");
    let message = body["data"]["message"].as_str().unwrap();
    assert!(message.starts_with("Found 2 listings:"));
}

#[tokio::test]
async fn search_message_counts_the_whole_match_set() {
    let (status, body) = call(
        app(None),
        post(
            "/search",
            json!({
                "filters": {"city": "Gdańsk", "rooms": 2, "max_price": 4000},
                "limit": 1
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["candidates"], 2);
    assert_eq!(result_ids(&body).len(), 1);
    let message = body["data"]["message"].as_str().unwrap();
    assert!(message.starts_with("Found 2 listings:"), "{message}");
    assert!(message.ends_with("...and 1 more"), "{message}");
}

#[tokio::test]
async fn search_rejects_malformed_filter_with_envelope() {
    let (status, body) = call(
        app(None),
        post("/search", json!({"filters": {"max_price": "cheap"}})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "INVALID_FILTER");
    assert_eq!(body["error"]["details"][0]["path"], "filters.max_price");
}

#[tokio::test]
async fn undecodable_body_is_wrapped_in_envelope() {
    let req = Request::builder()
        .method("POST")
        .uri("/search")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = call(app(None), req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn chat_applies_extracted_criteria() {
    let criteria: SearchCriteria = serde_json::from_value(json!({
        "city": "Gdańsk", "room_count": 2, "max_price": 4000, "transaction_type": "wynajem"
    }))
    .unwrap();
    let extractor: Arc<dyn CriteriaExtractor> = Arc::new(CannedExtractor(Ok(Some(criteria))));

    let (status, body) = call(
        app(Some(extractor)),
        post("/chat", json!({"prompt": "Szukam 2 pokoi w Gdańsku do 4000 zł"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["criteria"]["city"], "Gdańsk");
    assert_eq!(result_ids(&body), vec!["near", "far"]);
    assert_eq!(body["data"]["degraded"], false);
}

#[tokio::test]
async fn chat_survives_extraction_failure() {
    let extractor: Arc<dyn CriteriaExtractor> = Arc::new(CannedExtractor(Err(
        ProviderError::Unreachable("connection refused".into()),
    )));

    let (status, body) = call(
        app(Some(extractor)),
        post("/chat", json!({"prompt": "coś przy morzu", "limit": 2})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["criteria"].is_null());
    assert_eq!(body["data"]["degraded"], true);
    assert_eq!(result_ids(&body), vec!["sopot", "pricey"]);
}

#[tokio::test]
async fn chat_rejects_blank_prompt() {
    let (status, body) = call(app(None), post("/chat", json!({"prompt": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn health_reports_store_and_embedder() {
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(app(None), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["embedder"], "origin");
    assert_eq!(body["data"]["store"]["total"], 4);
    assert_eq!(body["data"]["store"]["embedding_dim"], 2);
    assert_eq!(body["data"]["providers"], json!([]));
}
