use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use crate::common;

#[tokio::test]
async fn super_admin_initializes_a_dealer() {
    let (app, pool, _guard) = common::test_app().await;

    let sa = common::seed_user(
        &pool,
        common::DEALER,
        "a-sa@x.com",
        "super_admin",
        "super_admin",
        true,
    )
    .await;
    let token = common::create_test_token(sa, "a-sa@x.com", "super_admin", "super_admin");

    let body = serde_json::json!({
        "id": "bluebonnet",
        "name": "Bluebonnet Homes",
        "contact_email": "sales@bluebonnet.example",
    })
    .to_string();
    let (status, dealer) =
        common::post_json_authed(&app, "/api/admin/dealers", &body, common::DEALER, &token).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(dealer["id"], "bluebonnet");
    assert_eq!(dealer["name"], "Bluebonnet Homes");
}

#[tokio::test]
async fn empty_dealer_id_rejected() {
    let (app, pool, _guard) = common::test_app().await;

    let sa = common::seed_user(
        &pool,
        common::DEALER,
        "a-sa2@x.com",
        "super_admin",
        "super_admin",
        true,
    )
    .await;
    let token = common::create_test_token(sa, "a-sa2@x.com", "super_admin", "super_admin");

    let body = serde_json::json!({ "id": "   ", "name": "Blank" }).to_string();
    let (status, resp) =
        common::post_json_authed(&app, "/api/admin/dealers", &body, common::DEALER, &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Dealer ID cannot be empty");
}

#[tokio::test]
async fn admins_cannot_manage_dealers() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id =
        common::seed_user(&pool, common::DEALER, "a-adm@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "a-adm@x.com", "admin", "admin");

    let body = serde_json::json!({ "id": "rogue", "name": "Rogue" }).to_string();
    let (status, _) =
        common::post_json_authed(&app, "/api/admin/dealers", &body, common::DEALER, &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn dealer_stats_counts_users_and_deliveries() {
    let (app, pool, _guard) = common::test_app().await;

    let sa = common::seed_user(
        &pool,
        common::DEALER,
        "a-sa3@x.com",
        "super_admin",
        "super_admin",
        true,
    )
    .await;
    let token = common::create_test_token(sa, "a-sa3@x.com", "super_admin", "super_admin");
    let buyer = common::seed_user(&pool, common::DEALER, "a-b@x.com", "customer", "user", true).await;
    common::seed_delivery(&pool, common::DEALER, buyer, "scheduled").await;

    let (status, stats) =
        common::get_authed(&app, "/api/admin/dealers/stats", common::DEALER, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["dealer_id"], common::DEALER);
    assert_eq!(stats["user_count"], 2);
    assert_eq!(stats["delivery_count"], 1);
}

#[tokio::test]
async fn stats_for_unknown_dealer_404() {
    let (app, pool, _guard) = common::test_app().await;

    let sa = common::seed_user(
        &pool,
        common::DEALER,
        "a-sa4@x.com",
        "super_admin",
        "super_admin",
        true,
    )
    .await;
    let token = common::create_test_token(sa, "a-sa4@x.com", "super_admin", "super_admin");

    let (status, _) =
        common::get_authed(&app, "/api/admin/dealers/stats", "no-such-dealer", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
