//! Tests for the Mailchimp client against a mock server
//!
//! Covers:
//! - Request shape of the subscribe call
//! - Error mapping for API errors and slow responses
//! - Accepted submissions reaching the subscribe call through the router

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use maillistr_common::config::{DispatchConfig, MailchimpConfig};
use maillistr_common::db::{self, lists};
use maillistr_server::dispatch::{
    Dispatcher, ExternalSyncError, MailchimpClient, SubscriptionApi,
};
use maillistr_server::{build_router, AppState};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;
use wiremock::{
    matchers::{body_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

const MAILCHIMP_KEY: &str = "abc123-us9";

fn client_for(server: &MockServer, timeout_secs: u64) -> MailchimpClient {
    let config = MailchimpConfig {
        enabled: true,
        api_key: MAILCHIMP_KEY.to_string(),
        base_url: Some(server.uri()),
        timeout_secs,
    };
    MailchimpClient::new(&config).expect("Client should build")
}

fn expected_body(list_id: &str, email: &str) -> serde_json::Value {
    json!({
        "apikey": MAILCHIMP_KEY,
        "id": list_id,
        "email": { "email": email },
        "double_optin": false,
        "update_existing": true,
        "send_welcome": false
    })
}

#[tokio::test]
async fn test_subscribe_request_shape() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/lists/subscribe.json"))
        .and(body_json(expected_body("mc-1", "a@x.com")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "email": "a@x.com",
            "euid": "e1",
            "leid": "l1"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 5);
    let result = client.subscribe("mc-1", "a@x.com").await;

    assert!(result.is_ok(), "Subscribe failed: {:?}", result.err());
}

#[tokio::test]
async fn test_api_error_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/lists/subscribe.json"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "status": "error",
            "code": 200,
            "name": "List_DoesNotExist",
            "error": "Invalid MailChimp List ID: mc-404"
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 5);
    match client.subscribe("mc-404", "a@x.com").await {
        Err(ExternalSyncError::Api(status, message)) => {
            assert_eq!(status, 500);
            assert!(message.contains("List_DoesNotExist"));
            assert!(message.contains("Invalid MailChimp List ID"));
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_json_error_body_is_kept() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/lists/subscribe.json"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 5);
    match client.subscribe("mc-1", "a@x.com").await {
        Err(ExternalSyncError::Api(502, message)) => assert_eq!(message, "bad gateway"),
        other => panic!("Expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/lists/subscribe.json"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 1);
    let result = client.subscribe("mc-1", "a@x.com").await;

    match result {
        Err(ExternalSyncError::Timeout(after)) => assert_eq!(after, Duration::from_secs(1)),
        other => panic!("Expected Timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_server_is_a_network_error() {
    let config = MailchimpConfig {
        enabled: true,
        api_key: MAILCHIMP_KEY.to_string(),
        // Reserved port, nothing listens there
        base_url: Some("http://127.0.0.1:9".to_string()),
        timeout_secs: 5,
    };
    let client = MailchimpClient::new(&config).unwrap();

    let result = client.subscribe("mc-1", "a@x.com").await;
    assert!(matches!(result, Err(ExternalSyncError::Network(_))));
}

#[tokio::test]
async fn test_accepted_submission_is_forwarded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/lists/subscribe.json"))
        .and(body_json(expected_body("mc-1", "a@x.com")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let pool = db::init_database(&temp_dir.path().join("sync.db"))
        .await
        .unwrap();
    lists::create_list(&pool, "news", Some("mc-1")).await.unwrap();

    let dispatch_config = DispatchConfig {
        queue_capacity: 8,
        max_in_flight: 2,
    };
    let (dispatcher, worker) = Dispatcher::spawn(
        Arc::new(client_for(&mock_server, 5)),
        &dispatch_config,
        Duration::from_secs(5),
    );
    let app = build_router(AppState::new(pool, "key", Some(dispatcher)));

    // Submitted twice; only the first one is forwarded
    for _ in 0..2 {
        let request = Request::builder()
            .method("POST")
            .uri("/news/entries")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("email=a%40x.com"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    drop(app);
    tokio::time::timeout(Duration::from_secs(10), worker)
        .await
        .expect("Dispatch worker should drain")
        .unwrap();

    mock_server.verify().await;
}
