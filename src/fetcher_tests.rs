//! Tests for the JSON fetcher.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::fetcher::{redact_url, FetchError, JsonFetcher, Transport};

#[derive(Debug, Deserialize)]
struct Payload {
    value: u32,
}

fn fetcher() -> JsonFetcher {
    JsonFetcher::new(&Transport::Direct, Duration::from_secs(5)).unwrap()
}

// ── fetch_json ───────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_json_decodes_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/thing"))
        .and(header("Content-Type", "application/json; charset=utf-8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": 7,
            "ignored": "extra fields are fine"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/thing", mock_server.uri());
    let payload: Payload = fetcher().fetch_json(&url).await.unwrap();
    assert_eq!(payload.value, 7);
}

#[tokio::test]
async fn fetch_json_non_2xx_is_status_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(ResponseTemplate::new(403).set_body_string("null"))
        .mount(&mock_server)
        .await;

    let url = format!("{}/private", mock_server.uri());
    let result = fetcher().fetch_json::<Payload>(&url).await;

    match result {
        Err(FetchError::Status(status)) => assert_eq!(status, StatusCode::FORBIDDEN),
        other => panic!("Expected FetchError::Status, got: {other:?}"),
    }
}

#[tokio::test]
async fn fetch_json_wrong_shape_is_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/thing"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
        .mount(&mock_server)
        .await;

    let url = format!("{}/thing", mock_server.uri());
    let result = fetcher().fetch_json::<Payload>(&url).await;
    assert!(matches!(result, Err(FetchError::Decode(_))));
}

#[tokio::test]
async fn fetch_slow_response_is_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "value": 1 }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let quick = JsonFetcher::new(&Transport::Direct, Duration::from_millis(200)).unwrap();
    let url = format!("{}/slow", mock_server.uri());
    let result = quick.fetch_bytes(&url).await;

    match result {
        Err(err @ FetchError::Timeout(_)) => assert!(err.is_retryable()),
        other => panic!("Expected FetchError::Timeout, got: {other:?}"),
    }
}

#[tokio::test]
async fn fetch_unreachable_host_is_network_error() {
    // Port 9 (discard) on localhost is not listening in test environments
    let result = fetcher().fetch_bytes("http://127.0.0.1:9/nothing").await;
    assert!(matches!(result, Err(FetchError::Network(_))));
}

// ── transport ────────────────────────────────────────────────────────

#[test]
fn proxied_transport_accepts_socks_address() {
    let transport = Transport::Proxied("socks5h://127.0.0.1:9050".to_string());
    assert!(JsonFetcher::new(&transport, Duration::from_secs(1)).is_ok());
}

#[test]
fn proxied_transport_rejects_garbage_address() {
    let transport = Transport::Proxied("not a proxy url".to_string());
    let result = JsonFetcher::new(&transport, Duration::from_secs(1));
    assert!(matches!(result, Err(FetchError::Client(_))));
}

#[test]
fn default_transport_is_direct() {
    assert_eq!(Transport::default(), Transport::Direct);
}

// ── retry classification ─────────────────────────────────────────────

#[test]
fn status_retry_classification() {
    assert!(FetchError::Status(StatusCode::TOO_MANY_REQUESTS).is_retryable());
    assert!(FetchError::Status(StatusCode::BAD_GATEWAY).is_retryable());
    assert!(!FetchError::Status(StatusCode::FORBIDDEN).is_retryable());
    assert!(!FetchError::Status(StatusCode::NOT_FOUND).is_retryable());
}

// ── redact_url ───────────────────────────────────────────────────────

#[test]
fn redact_url_masks_api_key() {
    let url = "https://api.example.com/resolve/?key=SECRET&vanityurl=robin";
    assert_eq!(
        redact_url(url),
        "https://api.example.com/resolve/?key=***&vanityurl=robin"
    );
}

#[test]
fn redact_url_leaves_other_urls_alone() {
    let url = "https://steamcommunity.com/inventory/76561198012345678/753/6";
    assert_eq!(redact_url(url), url);

    let market = "https://steamcommunity.com/market/priceoverview/?monkey=1&appid=753";
    assert_eq!(redact_url(market), market);
}
