use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use crate::common;

async fn upsert_markup(
    app: &axum::Router,
    admin_token: &str,
    body: serde_json::Value,
) -> StatusCode {
    let (status, _) = common::post_json_authed(
        app,
        "/api/markups",
        &body.to_string(),
        common::DEALER,
        admin_token,
    )
    .await;
    status
}

#[tokio::test]
async fn user_tier_applies_parent_then_own_markup() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id = common::seed_user(&pool, common::DEALER, "adm@x.com", "admin", "admin", true).await;
    let admin_token = common::create_test_token(admin_id, "adm@x.com", "admin", "admin");
    let buyer_id =
        common::seed_user(&pool, common::DEALER, "buyer@x.com", "customer", "user", true).await;
    let buyer_token = common::create_test_token(buyer_id, "buyer@x.com", "customer", "user");

    let status = upsert_markup(
        &app,
        &admin_token,
        serde_json::json!({
            "user_id": buyer_id,
            "markup_percentage": 20.0,
            "super_admin_markup_percentage": 30.0,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let body = serde_json::json!({ "base_prices": [1000.0] }).to_string();
    let (status, quote) =
        common::post_json_authed(&app, "/api/pricing/quote", &body, common::DEALER, &buyer_token)
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["tier"], "user");
    // 1000 * 1.30 (parent) * 1.20 (own) = 1560
    assert_eq!(quote["lines"][0]["base_price"], 1000.0);
    assert_eq!(quote["lines"][0]["final_price"], 1560.0);
}

#[tokio::test]
async fn unconfigured_user_gets_tier_defaults() {
    let (app, pool, _guard) = common::test_app().await;

    let buyer_id =
        common::seed_user(&pool, common::DEALER, "plain@x.com", "customer", "user", true).await;
    let buyer_token = common::create_test_token(buyer_id, "plain@x.com", "customer", "user");

    let body = serde_json::json!({ "base_prices": [1000.0] }).to_string();
    let (status, quote) =
        common::post_json_authed(&app, "/api/pricing/quote", &body, common::DEALER, &buyer_token)
            .await;
    assert_eq!(status, StatusCode::OK);
    // Both levels default to 30%: 1000 * 1.30 * 1.30 = 1690
    assert_eq!(quote["lines"][0]["final_price"], 1690.0);
}

#[tokio::test]
async fn super_admin_markup_is_single_level() {
    let (app, pool, _guard) = common::test_app().await;

    let sa_id = common::seed_user(
        &pool,
        common::DEALER,
        "owner@x.com",
        "super_admin",
        "super_admin",
        true,
    )
    .await;
    let sa_token = common::create_test_token(sa_id, "owner@x.com", "super_admin", "super_admin");

    let status = upsert_markup(
        &app,
        &sa_token,
        serde_json::json!({
            "user_id": sa_id,
            "markup_percentage": 20.0,
            "tier_level": "super_admin",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let body = serde_json::json!({ "base_prices": [1000.0] }).to_string();
    let (status, quote) =
        common::post_json_authed(&app, "/api/pricing/quote", &body, common::DEALER, &sa_token)
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["tier"], "super_admin");
    // 1000 * 1.20, no parent level above the owner.
    assert_eq!(quote["lines"][0]["final_price"], 1200.0);
}

#[tokio::test]
async fn minimum_profit_floor_lifts_thin_markup() {
    let (app, pool, _guard) = common::test_app().await;

    let sa_id = common::seed_user(
        &pool,
        common::DEALER,
        "thin@x.com",
        "super_admin",
        "super_admin",
        true,
    )
    .await;
    let sa_token = common::create_test_token(sa_id, "thin@x.com", "super_admin", "super_admin");

    upsert_markup(
        &app,
        &sa_token,
        serde_json::json!({
            "user_id": sa_id,
            "markup_percentage": 1.0,
            "tier_level": "super_admin",
        }),
    )
    .await;

    let body = serde_json::json!({ "base_prices": [1000.0], "min_profit": 500.0 }).to_string();
    let (status, quote) =
        common::post_json_authed(&app, "/api/pricing/quote", &body, common::DEALER, &sa_token)
            .await;
    assert_eq!(status, StatusCode::OK);
    // 1% markup gives 1010, below the 500 profit floor: 1000 + 500 wins.
    assert_eq!(quote["lines"][0]["final_price"], 1500.0);
}

#[tokio::test]
async fn quote_rejects_empty_price_list() {
    let (app, pool, _guard) = common::test_app().await;

    let buyer_id =
        common::seed_user(&pool, common::DEALER, "empty@x.com", "customer", "user", true).await;
    let token = common::create_test_token(buyer_id, "empty@x.com", "customer", "user");

    let body = serde_json::json!({ "base_prices": [] }).to_string();
    let (status, resp) =
        common::post_json_authed(&app, "/api/pricing/quote", &body, common::DEALER, &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["message"].as_str().unwrap_or("").contains("base_prices"));
}

#[tokio::test]
async fn zero_base_price_quotes_zero() {
    let (app, pool, _guard) = common::test_app().await;

    let buyer_id =
        common::seed_user(&pool, common::DEALER, "zero@x.com", "customer", "user", true).await;
    let token = common::create_test_token(buyer_id, "zero@x.com", "customer", "user");

    let body = serde_json::json!({ "base_prices": [0.0] }).to_string();
    let (status, quote) =
        common::post_json_authed(&app, "/api/pricing/quote", &body, common::DEALER, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["lines"][0]["final_price"], 0.0);
}

#[tokio::test]
async fn quote_requires_authentication() {
    let (app, _pool, _guard) = common::test_app().await;

    let body = serde_json::json!({ "base_prices": [1000.0] }).to_string();
    let (status, _) = common::post_json(&app, "/api/pricing/quote", &body, common::DEALER).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
