use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use crate::common;

#[tokio::test]
async fn anonymous_events_are_accepted() {
    let (app, _pool, _guard) = common::test_app().await;

    let body = serde_json::json!({
        "event_type": "page_view",
        "properties": { "path": "/inventory" },
    })
    .to_string();
    let (status, event) =
        common::post_json(&app, "/api/analytics/events", &body, common::DEALER).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(event["event_type"], "page_view");
    assert!(event.get("user_id").is_none());
}

#[tokio::test]
async fn authenticated_events_capture_the_user() {
    let (app, pool, _guard) = common::test_app().await;

    let buyer = common::seed_user(&pool, common::DEALER, "an-b@x.com", "customer", "user", true).await;
    let token = common::create_test_token(buyer, "an-b@x.com", "customer", "user");

    let body = serde_json::json!({ "event_type": "estimate_viewed" }).to_string();
    let (status, event) =
        common::post_json_authed(&app, "/api/analytics/events", &body, common::DEALER, &token).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(event["user_id"], buyer);
}

#[tokio::test]
async fn empty_event_type_rejected() {
    let (app, _pool, _guard) = common::test_app().await;

    let body = serde_json::json!({ "event_type": "" }).to_string();
    let (status, _) =
        common::post_json(&app, "/api/analytics/events", &body, common::DEALER).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn summary_aggregates_dealer_activity() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id =
        common::seed_user(&pool, common::DEALER, "an-adm@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "an-adm@x.com", "admin", "admin");
    common::seed_user(&pool, common::DEALER, "an-pending@x.com", "customer", "user", false).await;
    let buyer =
        common::seed_user(&pool, common::DEALER, "an-b2@x.com", "customer", "user", true).await;
    common::seed_delivery(&pool, common::DEALER, buyer, "in_transit").await;

    for _ in 0..2 {
        let body = serde_json::json!({ "event_type": "page_view" }).to_string();
        common::post_json(&app, "/api/analytics/events", &body, common::DEALER).await;
    }
    let body = serde_json::json!({ "event_type": "quote_requested" }).to_string();
    common::post_json(&app, "/api/analytics/events", &body, common::DEALER).await;

    let (status, summary) =
        common::get_authed(&app, "/api/analytics/summary", common::DEALER, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_events"], 3);
    assert_eq!(summary["active_deliveries"], 1);
    assert_eq!(summary["pending_users"], 1);

    let by_type = summary["events_by_type"].as_array().unwrap();
    let page_views = by_type
        .iter()
        .find(|c| c["event_type"] == "page_view")
        .expect("page_view count missing");
    assert_eq!(page_views["count"], 2);
}

#[tokio::test]
async fn summary_is_staff_only() {
    let (app, pool, _guard) = common::test_app().await;

    let buyer = common::seed_user(&pool, common::DEALER, "an-b3@x.com", "customer", "user", true).await;
    let token = common::create_test_token(buyer, "an-b3@x.com", "customer", "user");

    let (status, _) =
        common::get_authed(&app, "/api/analytics/summary", common::DEALER, &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn events_are_tenant_scoped() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id =
        common::seed_user(&pool, common::DEALER, "an-adm2@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "an-adm2@x.com", "admin", "admin");

    let body = serde_json::json!({ "event_type": "page_view" }).to_string();
    common::post_json(&app, "/api/analytics/events", &body, common::OTHER_DEALER).await;

    let (_, summary) =
        common::get_authed(&app, "/api/analytics/summary", common::DEALER, &token).await;
    assert_eq!(summary["total_events"], 0);
}
