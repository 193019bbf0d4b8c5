//! Webhook-fed billing map driving the due tag.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use mailguard::directory::InMemoryDirectory;
use mailguard_integration_tests::TestContext;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test(start_paused = true)]
async fn test_webhook_then_tag_then_untag() {
    let ctx = TestContext::new(
        InMemoryDirectory::new()
            .with_customer(42, "a@x.com", "vip")
            .with_customer(43, "b@x.com", "subscription due today"),
    )
    .await;

    let response = ctx
        .app()
        .oneshot(
            Request::post("/webhooks/billing-date")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "partner::next_billing_date": "2025-06-30",
                        "partner::customer_email": "a@x.com",
                        "shopify::customer_id": "gid://shopify/Customer/42",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let due_day = "2025-06-30".parse().unwrap();
    let report = ctx.state.tagger().tag_due_on(due_day).await;
    assert_eq!(report.tagged, 1);
    assert_eq!(
        ctx.directory.tags(42).unwrap().to_string(),
        "vip, subscription due today"
    );

    // Same day: 42 keeps its tag, 43 has no billing entry and loses it.
    let report = ctx.state.tagger().untag_expired_on(due_day).await;
    assert_eq!(report.kept, 1);
    assert_eq!(report.untagged, 1);
    assert!(ctx.directory.tags(43).unwrap().is_empty());

    // Next day: 42 is no longer due.
    let report = ctx
        .state
        .tagger()
        .untag_expired_on("2025-07-01".parse().unwrap())
        .await;
    assert_eq!(report.untagged, 1);
    assert_eq!(ctx.directory.tags(42).unwrap().to_string(), "vip");
}
