//! Health endpoint and authentication gate tests
//!
//! None of these reach the database.

mod common;

use common::TestApp;

#[tokio::test]
async fn test_public_health_returns_status_ok() {
    let app = TestApp::new().await;

    let response = app.client
        .get(app.url("/api/v1/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("application/json"));

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = TestApp::new().await;

    let response = app.client
        .get(app.url("/api/v1/health"))
        .send()
        .await
        .unwrap();

    assert!(response.headers().get("x-request-id").is_some());
}

#[tokio::test]
async fn test_incoming_request_id_is_propagated() {
    let app = TestApp::new().await;

    let response = app.client
        .get(app.url("/api/v1/health"))
        .header("x-request-id", "trace-me-123")
        .send()
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-request-id").unwrap().to_str().unwrap(),
        "trace-me-123"
    );
}

#[tokio::test]
async fn test_protected_route_without_token_returns_401() {
    let app = TestApp::new().await;

    let response = app.client
        .get(app.url("/api/v1/doctors"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_protected_route_with_malformed_token_returns_401() {
    let app = TestApp::new().await;

    let response = app.client
        .get(app.url("/api/v1/appointments"))
        .header("Authorization", "Bearer not.a.jwt")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_protected_route_with_wrong_scheme_returns_401() {
    let app = TestApp::new().await;

    let response = app.client
        .get(app.url("/api/v1/auth/me"))
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = TestApp::new().await;

    let response = app.client
        .get(app.url("/api/v1/nope"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}
