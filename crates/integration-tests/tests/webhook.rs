//! Billing-date webhook over HTTP.

#![allow(clippy::unwrap_used)]

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use mailguard::directory::InMemoryDirectory;
use mailguard_core::CustomerId;
use mailguard_integration_tests::TestContext;
use serde_json::{Value, json};
use tower::ServiceExt;

fn post_json(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhooks/billing-date")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_webhook_records_billing_date() {
    let ctx = TestContext::new(InMemoryDirectory::new()).await;

    let response = ctx
        .app()
        .oneshot(post_json(&json!({
            "partner::next_billing_date": "2025-06-30",
            "partner::customer_email": "a@x.com",
            "shopify::customer_id": "gid://shopify/Customer/1234567890",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let entry = ctx
        .state
        .billing()
        .get(CustomerId::new(1_234_567_890))
        .await
        .unwrap();
    assert_eq!(entry.next_billing_date.to_string(), "2025-06-30");
    assert_eq!(entry.email, "a@x.com");

    let raw: Value = serde_json::from_slice(
        &std::fs::read(ctx.state_dir.path().join("billing_dates.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(
        raw,
        json!({"1234567890": {"nextBillingDate": "2025-06-30", "email": "a@x.com"}})
    );
}

#[tokio::test]
async fn test_webhook_last_write_wins() {
    let ctx = TestContext::new(InMemoryDirectory::new()).await;

    for date in ["2025-06-30", "2025-07-30"] {
        let response = ctx
            .app()
            .oneshot(post_json(&json!({
                "partner::next_billing_date": date,
                "partner::customer_email": "a@x.com",
                "shopify::customer_id": "7",
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let entry = ctx.state.billing().get(CustomerId::new(7)).await.unwrap();
    assert_eq!(entry.next_billing_date.to_string(), "2025-07-30");
    assert_eq!(ctx.state.billing().len().await, 1);
}

#[tokio::test]
async fn test_webhook_rejects_incomplete_payload() {
    let ctx = TestContext::new(InMemoryDirectory::new()).await;

    let response = ctx
        .app()
        .oneshot(post_json(&json!({
            "partner::next_billing_date": "2025-06-30",
            "shopify::customer_id": "7",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&body).contains("partner::customer_email"));
    assert!(ctx.state.billing().is_empty().await);
}

#[tokio::test]
async fn test_webhook_rejects_bad_date() {
    let ctx = TestContext::new(InMemoryDirectory::new()).await;

    let response = ctx
        .app()
        .oneshot(post_json(&json!({
            "partner::next_billing_date": "soon",
            "partner::customer_email": "a@x.com",
            "shopify::customer_id": "7",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(ctx.state.billing().is_empty().await);
}

#[tokio::test]
async fn test_webhook_reports_persistence_failure() {
    let ctx = TestContext::new(InMemoryDirectory::new()).await;
    // A non-empty directory in place of the file makes the rename fail.
    let blocker = ctx.state_dir.path().join("billing_dates.json");
    std::fs::create_dir(&blocker).unwrap();
    std::fs::write(blocker.join("keep"), "x").unwrap();

    let response = ctx
        .app()
        .oneshot(post_json(&json!({
            "partner::next_billing_date": "2025-06-30",
            "partner::customer_email": "a@x.com",
            "shopify::customer_id": "7",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(ctx.state.billing().is_empty().await);
}

#[tokio::test]
async fn test_health_and_status() {
    let ctx = TestContext::new(InMemoryDirectory::new()).await;

    let health = ctx
        .app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let ready = ctx
        .app()
        .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(ready.status(), StatusCode::OK);

    let status = ctx
        .app()
        .oneshot(Request::get("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(status.status(), StatusCode::OK);
    let body = to_bytes(status.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["runActive"], json!(false));
    assert_eq!(body["suppressionPending"], json!(false));
    assert_eq!(body["billingEntries"], json!(0));
    assert_eq!(body["timezone"], json!("America/New_York"));
}

#[tokio::test]
async fn test_readiness_fails_without_state_dir() {
    let ctx = TestContext::new(InMemoryDirectory::new()).await;
    std::fs::remove_dir_all(ctx.state_dir.path()).unwrap();

    let ready = ctx
        .app()
        .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(ready.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = to_bytes(ready.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&body).starts_with("Unavailable: state directory"));
}
