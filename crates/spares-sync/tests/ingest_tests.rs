//! Integration tests for upstream catalog ingestion
//!
//! These tests verify:
//! - Page counting and termination against a mock webhook
//! - Request body and API key header
//! - Envelope shapes accepted by the extraction chain
//! - Error classes for non-2xx, unreachable and malformed responses

use serde_json::{json, Value};
use spares_sync::config::UpstreamConfig;
use spares_sync::error::IngestionError;
use spares_sync::ingest::{fetch_all, CatalogSource, HttpCatalogClient, PageEnd};
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const WEBHOOK_PATH: &str = "/webhook/spares";

fn upstream(server: &MockServer, api_key: Option<&str>) -> UpstreamConfig {
    UpstreamConfig {
        base_url: server.uri(),
        path: WEBHOOK_PATH.to_string(),
        api_key: api_key.map(str::to_string),
        timeout_secs: 5,
    }
}

fn spares(page: u32, count: usize) -> Value {
    Value::Array(
        (0..count)
            .map(|i| json!({"spareCode": format!("P{}-{}", page, i), "spareName": "Part"}))
            .collect(),
    )
}

async fn mount_page(server: &MockServer, page: u32, body: Value) {
    Mock::given(method("POST"))
        .and(path(WEBHOOK_PATH))
        .and(body_json(json!({"tenantId": 42, "page": page, "size": 10})))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

// ============================================================================
// Paging
// ============================================================================

#[tokio::test]
async fn test_stops_after_short_page() {
    let server = MockServer::start().await;
    mount_page(&server, 0, spares(0, 10)).await;
    mount_page(&server, 1, spares(1, 10)).await;
    mount_page(&server, 2, spares(2, 7)).await;

    let client = HttpCatalogClient::new(&upstream(&server, None), "42").unwrap();
    let fetch = fetch_all(&client, 10).await.unwrap();

    assert_eq!(fetch.records.len(), 27);
    assert_eq!(fetch.requests, 3);
    assert_eq!(fetch.end, PageEnd::ShortPage);
    assert_eq!(fetch.records[0]["spareCode"], "P0-0");
    assert_eq!(fetch.records[26]["spareCode"], "P2-6");
}

#[tokio::test]
async fn test_exact_multiple_needs_trailing_empty_page() {
    let server = MockServer::start().await;
    mount_page(&server, 0, spares(0, 10)).await;
    mount_page(&server, 1, spares(1, 10)).await;
    mount_page(&server, 2, json!([])).await;

    let client = HttpCatalogClient::new(&upstream(&server, None), "42").unwrap();
    let fetch = fetch_all(&client, 10).await.unwrap();

    assert_eq!(fetch.records.len(), 20);
    assert_eq!(fetch.requests, 3);
    assert_eq!(fetch.end, PageEnd::EmptyPage);
}

#[tokio::test]
async fn test_empty_first_page() {
    let server = MockServer::start().await;
    mount_page(&server, 0, json!({"data": []})).await;

    let client = HttpCatalogClient::new(&upstream(&server, None), "42").unwrap();
    let fetch = fetch_all(&client, 10).await.unwrap();

    assert!(fetch.records.is_empty());
    assert_eq!(fetch.requests, 1);
    assert_eq!(fetch.end, PageEnd::EmptyFirstPage);
}

// ============================================================================
// Request shape
// ============================================================================

#[tokio::test]
async fn test_sends_api_key_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(WEBHOOK_PATH))
        .and(header("X-N8N-API-KEY", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpCatalogClient::new(&upstream(&server, Some("secret")), "42").unwrap();
    client.fetch_page(0, 10).await.unwrap();
}

#[tokio::test]
async fn test_non_numeric_tenant_sent_as_string() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(WEBHOOK_PATH))
        .and(body_json(json!({"tenantId": "acme", "page": 0, "size": 5})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpCatalogClient::new(&upstream(&server, None), "acme").unwrap();
    fetch_all(&client, 5).await.unwrap();
}

// ============================================================================
// Envelopes
// ============================================================================

#[tokio::test]
async fn test_envelope_shapes() {
    let cases = vec![
        json!({"spares": [{"spareCode": "A", "spareName": "Bolt"}]}),
        json!({"items": [{"spareCode": "A", "spareName": "Bolt"}]}),
        json!({"spareCode": "A", "spareName": "Bolt"}),
        json!({"meta": {"page": 0}, "rows": [{"spareCode": "A", "spareName": "Bolt"}]}),
    ];

    for body in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(WEBHOOK_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .mount(&server)
            .await;

        let client = HttpCatalogClient::new(&upstream(&server, None), "42").unwrap();
        let fetch = fetch_all(&client, 10).await.unwrap();
        assert_eq!(fetch.records.len(), 1, "envelope {}", body);
        assert_eq!(fetch.records[0]["spareCode"], "A");
    }
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(WEBHOOK_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("workflow inactive"))
        .mount(&server)
        .await;

    let client = HttpCatalogClient::new(&upstream(&server, None), "42").unwrap();
    let err = fetch_all(&client, 10).await.unwrap_err();

    match err {
        IngestionError::Status { page, status, body } => {
            assert_eq!(page, 0);
            assert_eq!(status, 503);
            assert_eq!(body, "workflow inactive");
        },
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_failure_on_later_page_reports_page() {
    let server = MockServer::start().await;
    mount_page(&server, 0, spares(0, 10)).await;
    Mock::given(method("POST"))
        .and(path(WEBHOOK_PATH))
        .and(body_json(json!({"tenantId": 42, "page": 1, "size": 10})))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = HttpCatalogClient::new(&upstream(&server, None), "42").unwrap();
    let err = fetch_all(&client, 10).await.unwrap_err();
    assert_eq!(err.page(), 1);
}

#[tokio::test]
async fn test_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(WEBHOOK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = HttpCatalogClient::new(&upstream(&server, None), "42").unwrap();
    let err = fetch_all(&client, 10).await.unwrap_err();
    assert!(matches!(err, IngestionError::MalformedResponse { page: 0, .. }));
}

#[tokio::test]
async fn test_unreachable_upstream() {
    let server = MockServer::start().await;
    let config = upstream(&server, None);
    drop(server);

    let client = HttpCatalogClient::new(&config, "42").unwrap();
    let err = fetch_all(&client, 10).await.unwrap_err();
    assert!(matches!(err, IngestionError::Unreachable { page: 0, .. }));
}
