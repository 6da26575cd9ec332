use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use crate::common;

#[tokio::test]
async fn admin_can_upsert_and_list_markups() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id =
        common::seed_user(&pool, common::DEALER, "mk-adm@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "mk-adm@x.com", "admin", "admin");
    let buyer_id =
        common::seed_user(&pool, common::DEALER, "mk-buyer@x.com", "customer", "user", true).await;

    let body = serde_json::json!({
        "user_id": buyer_id,
        "markup_percentage": 20.0,
        "super_admin_markup_percentage": 30.0,
    })
    .to_string();
    let (status, markup) =
        common::post_json_authed(&app, "/api/markups", &body, common::DEALER, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(markup["user_id"], buyer_id);
    assert_eq!(markup["markup_percentage"], 20.0);
    assert_eq!(markup["tier_level"], "user");

    let (status, list) = common::get_authed(&app, "/api/markups", common::DEALER, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn upsert_replaces_existing_row() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id =
        common::seed_user(&pool, common::DEALER, "mk-adm2@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "mk-adm2@x.com", "admin", "admin");
    let buyer_id =
        common::seed_user(&pool, common::DEALER, "mk-buyer2@x.com", "customer", "user", true).await;

    for pct in [15.0, 25.0] {
        let body = serde_json::json!({ "user_id": buyer_id, "markup_percentage": pct }).to_string();
        let (status, _) =
            common::post_json_authed(&app, "/api/markups", &body, common::DEALER, &token).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, list) = common::get_authed(&app, "/api/markups", common::DEALER, &token).await;
    let rows = list.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["markup_percentage"], 25.0);
}

#[tokio::test]
async fn markup_out_of_range_rejected() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id =
        common::seed_user(&pool, common::DEALER, "mk-adm3@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "mk-adm3@x.com", "admin", "admin");

    let body = serde_json::json!({ "user_id": 1, "markup_percentage": 900.0 }).to_string();
    let (status, _) =
        common::post_json_authed(&app, "/api/markups", &body, common::DEALER, &token).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn customers_cannot_manage_markups() {
    let (app, pool, _guard) = common::test_app().await;

    let buyer_id =
        common::seed_user(&pool, common::DEALER, "mk-cust@x.com", "customer", "user", true).await;
    let token = common::create_test_token(buyer_id, "mk-cust@x.com", "customer", "user");

    let body = serde_json::json!({ "user_id": buyer_id, "markup_percentage": 1.0 }).to_string();
    let (status, _) =
        common::post_json_authed(&app, "/api/markups", &body, common::DEALER, &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = common::get_authed(&app, "/api/markups", common::DEALER, &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn delete_markup_then_404() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id =
        common::seed_user(&pool, common::DEALER, "mk-adm4@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "mk-adm4@x.com", "admin", "admin");
    let buyer_id =
        common::seed_user(&pool, common::DEALER, "mk-buyer4@x.com", "customer", "user", true).await;

    let body = serde_json::json!({ "user_id": buyer_id, "markup_percentage": 10.0 }).to_string();
    common::post_json_authed(&app, "/api/markups", &body, common::DEALER, &token).await;

    let uri = format!("/api/markups/{}", buyer_id);
    let (status, _) = common::delete_authed(&app, &uri, common::DEALER, &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, resp) = common::delete_authed(&app, &uri, common::DEALER, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(resp["message"]
        .as_str()
        .unwrap_or("")
        .contains("No markup configuration"));
}

#[tokio::test]
async fn markups_are_tenant_scoped() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id =
        common::seed_user(&pool, common::DEALER, "mk-adm5@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "mk-adm5@x.com", "admin", "admin");
    let buyer_id =
        common::seed_user(&pool, common::DEALER, "mk-buyer5@x.com", "customer", "user", true).await;

    let body = serde_json::json!({ "user_id": buyer_id, "markup_percentage": 10.0 }).to_string();
    common::post_json_authed(&app, "/api/markups", &body, common::DEALER, &token).await;

    let (status, list) =
        common::get_authed(&app, "/api/markups", common::OTHER_DEALER, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 0);
}
