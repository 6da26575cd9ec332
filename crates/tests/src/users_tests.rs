use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use crate::common;

#[tokio::test]
async fn pending_filter_returns_unapproved_only() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id =
        common::seed_user(&pool, common::DEALER, "u-adm@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "u-adm@x.com", "admin", "admin");
    let pending_id =
        common::seed_user(&pool, common::DEALER, "u-pending@x.com", "customer", "user", false).await;
    common::seed_user(&pool, common::DEALER, "u-ok@x.com", "customer", "user", true).await;

    let (status, body) =
        common::get_authed(&app, "/api/users?pending=true", common::DEALER, &token).await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["user_id"], pending_id);
    assert_eq!(data[0]["approved"], false);
}

#[tokio::test]
async fn list_users_requires_admin() {
    let (app, pool, _guard) = common::test_app().await;

    let buyer_id =
        common::seed_user(&pool, common::DEALER, "u-cust@x.com", "customer", "user", true).await;
    let token = common::create_test_token(buyer_id, "u-cust@x.com", "customer", "user");

    let (status, _) = common::get_authed(&app, "/api/users", common::DEALER, &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn bulk_approve_flips_pending_accounts() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id =
        common::seed_user(&pool, common::DEALER, "u-adm2@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "u-adm2@x.com", "admin", "admin");
    let a = common::seed_user(&pool, common::DEALER, "u-a@x.com", "customer", "user", false).await;
    let b = common::seed_user(&pool, common::DEALER, "u-b@x.com", "customer", "user", false).await;

    let body = serde_json::json!({ "user_ids": [a, b] }).to_string();
    let (status, resp) =
        common::post_json_authed(&app, "/api/users/approve", &body, common::DEALER, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["approved"], 2);

    let (_, profile) =
        common::get_authed(&app, &format!("/api/users/{}", a), common::DEALER, &token).await;
    assert_eq!(profile["approved"], true);
}

#[tokio::test]
async fn bulk_approve_rejects_empty_list() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id =
        common::seed_user(&pool, common::DEALER, "u-adm3@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "u-adm3@x.com", "admin", "admin");

    let body = serde_json::json!({ "user_ids": [] }).to_string();
    let (status, _) =
        common::post_json_authed(&app, "/api/users/approve", &body, common::DEALER, &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn customer_reads_own_profile_but_not_others() {
    let (app, pool, _guard) = common::test_app().await;

    let me = common::seed_user(&pool, common::DEALER, "u-me@x.com", "customer", "user", true).await;
    let other =
        common::seed_user(&pool, common::DEALER, "u-other@x.com", "customer", "user", true).await;
    let token = common::create_test_token(me, "u-me@x.com", "customer", "user");

    let (status, profile) =
        common::get_authed(&app, &format!("/api/users/{}", me), common::DEALER, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], "u-me@x.com");

    let (status, _) =
        common::get_authed(&app, &format!("/api/users/{}", other), common::DEALER, &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn self_update_cannot_escalate_role_or_markup() {
    let (app, pool, _guard) = common::test_app().await;

    let me = common::seed_user(&pool, common::DEALER, "u-sneaky@x.com", "customer", "user", true).await;
    let token = common::create_test_token(me, "u-sneaky@x.com", "customer", "user");

    let body = serde_json::json!({
        "first_name": "Renamed",
        "role": "admin",
        "markup_percentage": 0.0,
    })
    .to_string();
    let (status, profile) = common::put_json_authed(
        &app,
        &format!("/api/users/{}", me),
        &body,
        common::DEALER,
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["first_name"], "Renamed");
    // Privileged fields are dropped for non-staff callers.
    assert_eq!(profile["role"], "customer");
    assert_eq!(profile["markup_percentage"], 30.0);
}

#[tokio::test]
async fn admin_update_can_change_role() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id =
        common::seed_user(&pool, common::DEALER, "u-adm4@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "u-adm4@x.com", "admin", "admin");
    let target =
        common::seed_user(&pool, common::DEALER, "u-target@x.com", "customer", "user", true).await;

    let body = serde_json::json!({ "role": "driver" }).to_string();
    let (status, profile) = common::put_json_authed(
        &app,
        &format!("/api/users/{}", target),
        &body,
        common::DEALER,
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["role"], "driver");
}

#[tokio::test]
async fn delete_user_then_404() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id =
        common::seed_user(&pool, common::DEALER, "u-adm5@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "u-adm5@x.com", "admin", "admin");
    let target =
        common::seed_user(&pool, common::DEALER, "u-gone@x.com", "customer", "user", true).await;

    let uri = format!("/api/users/{}", target);
    let (status, _) = common::delete_authed(&app, &uri, common::DEALER, &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = common::delete_authed(&app, &uri, common::DEALER, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
