#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Admin client against a fake admin endpoint.

mod common;

use std::time::Duration;

use caddy_orchestrator_admin::{AdminError, CaddyConfig};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{client_for, sample_config, unused_local_url};

// ===== fetch_config =====

#[tokio::test]
async fn fetch_config_returns_raw_document() {
    let server = MockServer::start().await;
    let live = json!({"admin": {"listen": "localhost:2019"}, "apps": {"http": {"servers": {}}}});
    Mock::given(method("GET"))
        .and(path("/config/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(live.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let fetched = client.fetch_config().await.unwrap();

    assert_eq!(fetched, live);
}

#[tokio::test]
async fn fetch_config_of_empty_instance_is_null() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null\n"))
        .mount(&server)
        .await;

    let fetched = client_for(&server.uri()).fetch_config().await.unwrap();
    assert!(fetched.is_null());
}

#[tokio::test]
async fn fetch_config_non_success_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client_for(&server.uri()).fetch_config().await.unwrap_err();
    match err {
        AdminError::Upstream { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected Upstream, got {other:?}"),
    }
}

#[tokio::test]
async fn fetch_config_unreachable_is_transport_error() {
    let err = client_for(&unused_local_url())
        .fetch_config()
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::Transport { .. }), "got {err:?}");
    assert!(err.is_transient());
}

// ===== apply_config =====

#[tokio::test]
async fn apply_config_posts_whole_document_to_load() {
    let server = MockServer::start().await;
    let config = sample_config("api.example.com", "127.0.0.1:9000");
    Mock::given(method("POST"))
        .and(path("/load"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::to_value(&config).unwrap()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server.uri())
        .apply_config(&config)
        .await
        .unwrap();
}

#[tokio::test]
async fn apply_config_sends_canonical_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/load"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = sample_config("a.example.com", "10.0.0.2:8080");
    let client = client_for(&server.uri());
    client.apply_config(&config).await.unwrap();
    client.apply_config(&config).await.unwrap();

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].body, requests[1].body);
    assert_eq!(
        requests[0].body,
        config.to_canonical_json().unwrap().into_bytes()
    );
}

#[tokio::test]
async fn apply_config_rejection_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/load"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string("loading config: unknown module 'foo'"),
        )
        .mount(&server)
        .await;

    let err = client_for(&server.uri())
        .apply_config(&CaddyConfig::admin_only())
        .await
        .unwrap_err();

    match &err {
        AdminError::ApplyRejected { status, body, .. } => {
            assert_eq!(*status, 400);
            assert!(body.contains("unknown module"));
        }
        other => panic!("expected ApplyRejected, got {other:?}"),
    }
    assert!(!err.is_transient());
}

// ===== health =====

#[tokio::test]
async fn health_ignores_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config/admin"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .mount(&server)
        .await;

    client_for(&server.uri()).health().await.unwrap();
}

#[tokio::test]
async fn health_non_2xx_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config/admin"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server.uri()).health().await.unwrap_err();
    assert!(matches!(err, AdminError::Upstream { status: 503, .. }));
}

#[tokio::test]
async fn health_slow_instance_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config/admin"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let err = client_for(&server.uri()).health().await.unwrap_err();
    assert!(matches!(err, AdminError::Timeout { .. }), "got {err:?}");
}

#[tokio::test]
async fn health_unreachable_fails() {
    let err = client_for(&unused_local_url()).health().await.unwrap_err();
    assert!(matches!(err, AdminError::Transport { .. }));
}
