use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use crate::common;

async fn create_faq(
    app: &axum::Router,
    token: &str,
    question: &str,
    published: bool,
) -> (StatusCode, serde_json::Value) {
    let body = serde_json::json!({
        "question": question,
        "answer": "It depends on the site prep.",
        "published": published,
    })
    .to_string();
    common::post_json_authed(app, "/api/faqs", &body, common::DEALER, token).await
}

#[tokio::test]
async fn anonymous_visitors_see_published_only() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id =
        common::seed_user(&pool, common::DEALER, "f-adm@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "f-adm@x.com", "admin", "admin");

    let (status, _) = create_faq(&app, &token, "How long does delivery take?", true).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = create_faq(&app, &token, "Draft question", false).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, list) = common::get_with_dealer(&app, "/api/faqs", common::DEALER).await;
    assert_eq!(status, StatusCode::OK);
    let faqs = list.as_array().unwrap();
    assert_eq!(faqs.len(), 1);
    assert_eq!(faqs[0]["question"], "How long does delivery take?");
}

#[tokio::test]
async fn staff_see_unpublished_entries() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id =
        common::seed_user(&pool, common::DEALER, "f-adm2@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "f-adm2@x.com", "admin", "admin");

    create_faq(&app, &token, "Published", true).await;
    create_faq(&app, &token, "Hidden draft", false).await;

    let (status, list) = common::get_authed(&app, "/api/faqs", common::DEALER, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn customers_cannot_create_faqs() {
    let (app, pool, _guard) = common::test_app().await;

    let buyer = common::seed_user(&pool, common::DEALER, "f-cust@x.com", "customer", "user", true).await;
    let token = common::create_test_token(buyer, "f-cust@x.com", "customer", "user");

    let (status, _) = create_faq(&app, &token, "Can I post this?", true).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn update_publishes_a_draft() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id =
        common::seed_user(&pool, common::DEALER, "f-adm3@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "f-adm3@x.com", "admin", "admin");

    let (_, faq) = create_faq(&app, &token, "Draft", false).await;
    let id = faq["id"].as_i64().unwrap();

    let body = serde_json::json!({ "published": true }).to_string();
    let (status, updated) = common::put_json_authed(
        &app,
        &format!("/api/faqs/{}", id),
        &body,
        common::DEALER,
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["published"], true);

    let (_, list) = common::get_with_dealer(&app, "/api/faqs", common::DEALER).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn delete_faq_then_404() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id =
        common::seed_user(&pool, common::DEALER, "f-adm4@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "f-adm4@x.com", "admin", "admin");

    let (_, faq) = create_faq(&app, &token, "Temporary", true).await;
    let id = faq["id"].as_i64().unwrap();

    let uri = format!("/api/faqs/{}", id);
    let (status, _) = common::delete_authed(&app, &uri, common::DEALER, &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, resp) = common::delete_authed(&app, &uri, common::DEALER, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(resp["message"].as_str().unwrap_or("").contains("FAQ"));
}

#[tokio::test]
async fn category_defaults_to_general_and_filters_the_list() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id =
        common::seed_user(&pool, common::DEALER, "f-adm6@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "f-adm6@x.com", "admin", "admin");

    let (status, faq) = create_faq(&app, &token, "Do you deliver on weekends?", true).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(faq["category"], "general");

    let body = serde_json::json!({
        "category": "financing",
        "question": "What down payment do you require?",
        "answer": "Ten percent for approved credit.",
        "published": true,
    })
    .to_string();
    let (status, _) = common::post_json_authed(&app, "/api/faqs", &body, common::DEALER, &token).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, list) =
        common::get_with_dealer(&app, "/api/faqs?category=financing", common::DEALER).await;
    assert_eq!(status, StatusCode::OK);
    let faqs = list.as_array().unwrap();
    assert_eq!(faqs.len(), 1);
    assert_eq!(faqs[0]["question"], "What down payment do you require?");

    let (_, list) = common::get_with_dealer(&app, "/api/faqs", common::DEALER).await;
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn update_can_move_an_entry_between_categories() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id =
        common::seed_user(&pool, common::DEALER, "f-adm7@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "f-adm7@x.com", "admin", "admin");

    let (_, faq) = create_faq(&app, &token, "Is setup included?", true).await;
    let id = faq["id"].as_i64().unwrap();

    let body = serde_json::json!({ "category": "delivery" }).to_string();
    let (status, updated) = common::put_json_authed(
        &app,
        &format!("/api/faqs/{}", id),
        &body,
        common::DEALER,
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["category"], "delivery");
    assert_eq!(updated["question"], "Is setup included?");
}

#[tokio::test]
async fn faqs_are_tenant_scoped() {
    let (app, pool, _guard) = common::test_app().await;

    let admin_id =
        common::seed_user(&pool, common::DEALER, "f-adm5@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "f-adm5@x.com", "admin", "admin");
    create_faq(&app, &token, "Sunrise only", true).await;

    let (status, list) = common::get_with_dealer(&app, "/api/faqs", common::OTHER_DEALER).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 0);
}
