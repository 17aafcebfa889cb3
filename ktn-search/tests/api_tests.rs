//! Integration tests for ktn-search API endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - Inscription search (any word / whole phrase)
//! - Customer search
//! - Pagination and ordering
//! - Request validation

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use ktn_common::db::{init_memory_database, OrderRecord, OrderStore};
use ktn_common::PartitionKey;
use ktn_search::{build_router, AppState};
use serde_json::Value;
use tower::util::ServiceExt; // for `oneshot` method

fn record(key: &PartitionKey, row_number: i64, search: &str, customer_link: &str) -> OrderRecord {
    OrderRecord {
        search: search.to_string(),
        inscription: search.to_string(),
        customer_link: customer_link.to_string(),
        ..OrderRecord::new(key, row_number)
    }
}

/// Test helper: in-memory store with two partitions
async fn setup_app() -> axum::Router {
    let store = OrderStore::new(init_memory_database().await.unwrap());

    let may = PartitionKey::from_parts(2023, 5, 17);
    store
        .replace_partition(
            &may,
            "hash-may".to_string(),
            vec![
                record(&may, 2, "FOREVER YOUNG", "https://vk.com/anna"),
                record(&may, 3, "LOVE YOU", "https://vk.com/Boris"),
            ],
        )
        .await
        .unwrap();

    let june = PartitionKey::from_parts(2023, 6, 1);
    store
        .replace_partition(
            &june,
            "hash-june".to_string(),
            vec![
                record(&june, 2, "LOVE FOREVER", "https://vk.com/clara"),
                record(&june, 4, "YOUNG AND FREE", "https://vk.com/anna"),
            ],
        )
        .await
        .unwrap();

    build_router(AppState::new(store))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn search(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app.clone().oneshot(get(uri)).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

fn rows(body: &Value) -> Vec<(String, i64)> {
    body["orders"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| {
            (
                o["date"].as_str().unwrap().to_string(),
                o["row_number"].as_i64().unwrap(),
            )
        })
        .collect()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app().await;
    let (status, body) = search(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "ktn-search");
    assert!(body["version"].is_string());
}

// =============================================================================
// Inscription search
// =============================================================================

#[tokio::test]
async fn test_any_word_search_newest_first() {
    let app = setup_app().await;
    let (status, body) = search(&app, "/search?search=love%20young").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["search_type"], "byInscription");
    assert_eq!(body["query"], "love young");
    assert_eq!(body["total_results"], 4);
    assert_eq!(
        rows(&body),
        vec![
            ("2023.06.01".to_string(), 2),
            ("2023.06.01".to_string(), 4),
            ("2023.05.17".to_string(), 2),
            ("2023.05.17".to_string(), 3),
        ]
    );
}

#[tokio::test]
async fn test_whole_phrase_search() {
    let app = setup_app().await;
    let (status, body) = search(
        &app,
        "/search?search=love%20forever&searchType=byInscription&wholePhrase=1",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_results"], 1);
    assert_eq!(rows(&body), vec![("2023.06.01".to_string(), 2)]);
    assert_eq!(body["orders"][0]["inscription"], "LOVE FOREVER");
}

#[tokio::test]
async fn test_empty_whole_phrase_means_any_word() {
    let app = setup_app().await;
    let (_, body) = search(&app, "/search?search=love%20forever&wholePhrase=").await;
    assert_eq!(body["total_results"], 3);
}

// =============================================================================
// Customer search
// =============================================================================

#[tokio::test]
async fn test_customer_search_case_insensitive() {
    let app = setup_app().await;

    let (status, body) = search(&app, "/search?search=VK.COM/ANNA&searchType=byCustomer").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["search_type"], "byCustomer");
    assert_eq!(body["total_results"], 2);

    let (_, body) = search(&app, "/search?search=boris&searchType=byCustomer").await;
    assert_eq!(rows(&body), vec![("2023.05.17".to_string(), 3)]);
}

// =============================================================================
// Pagination
// =============================================================================

#[tokio::test]
async fn test_pagination_limit_and_clamp() {
    let app = setup_app().await;

    let (_, body) = search(&app, "/search?search=love%20young&limit=3&page=2").await;
    assert_eq!(body["page"], 2);
    assert_eq!(body["page_size"], 3);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(rows(&body), vec![("2023.05.17".to_string(), 3)]);

    // Out-of-range page is clamped to the last one
    let (status, body) = search(&app, "/search?search=love%20young&limit=3&page=9").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 2);

    // Malformed numbers fall back to defaults
    let (_, body) = search(&app, "/search?search=love&limit=abc&page=x").await;
    assert_eq!(body["page"], 1);
    assert_eq!(body["page_size"], 10);
}

#[tokio::test]
async fn test_no_results() {
    let app = setup_app().await;
    let (status, body) = search(&app, "/search?search=nothing").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_results"], 0);
    assert_eq!(body["total_pages"], 0);
    assert_eq!(body["page"], 1);
    assert!(body["orders"].as_array().unwrap().is_empty());
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_empty_query_rejected() {
    let app = setup_app().await;

    let (status, body) = search(&app, "/search?search=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = search(&app, "/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_search_type_rejected() {
    let app = setup_app().await;
    let (status, body) = search(&app, "/search?search=love&searchType=byColour").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unknown search type: byColour");
}
