//! Smoke tests against a running server
//!
//! Start the server first, then run with: cargo test --test live_api -- --ignored

use reqwest::Client;
use serde_json::Value;

const BASE_URL: &str = "http://localhost:8080/api";

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_borrowing_requires_token() {
    let client = Client::new();

    let response = client
        .get(format!("{}/borrowing/requests/outgoing", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "NotAuthorized");
}

#[tokio::test]
#[ignore]
async fn test_invalid_token_rejected() {
    let client = Client::new();

    let response = client
        .get(format!("{}/notifications", BASE_URL))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}
