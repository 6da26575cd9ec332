use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use crate::common;

#[tokio::test]
async fn defaults_are_email_on_sms_off() {
    let (app, pool, _guard) = common::test_app().await;

    let buyer = common::seed_user(&pool, common::DEALER, "s-b@x.com", "customer", "user", true).await;
    let token = common::create_test_token(buyer, "s-b@x.com", "customer", "user");

    let (status, settings) =
        common::get_authed(&app, "/api/settings/notifications", common::DEALER, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["user_id"], buyer);
    assert_eq!(settings["email_enabled"], true);
    assert_eq!(settings["sms_enabled"], false);
}

#[tokio::test]
async fn partial_update_leaves_other_flag_alone() {
    let (app, pool, _guard) = common::test_app().await;

    let buyer = common::seed_user(&pool, common::DEALER, "s-b2@x.com", "customer", "user", true).await;
    let token = common::create_test_token(buyer, "s-b2@x.com", "customer", "user");

    let body = serde_json::json!({ "sms_enabled": true }).to_string();
    let (status, settings) = common::put_json_authed(
        &app,
        "/api/settings/notifications",
        &body,
        common::DEALER,
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["sms_enabled"], true);
    assert_eq!(settings["email_enabled"], true);

    let body = serde_json::json!({ "email_enabled": false }).to_string();
    let (_, settings) = common::put_json_authed(
        &app,
        "/api/settings/notifications",
        &body,
        common::DEALER,
        &token,
    )
    .await;
    assert_eq!(settings["email_enabled"], false);
    assert_eq!(settings["sms_enabled"], true);
}

#[tokio::test]
async fn settings_require_authentication() {
    let (app, _pool, _guard) = common::test_app().await;

    let (status, _) =
        common::get_with_dealer(&app, "/api/settings/notifications", common::DEALER).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn phone_code_requires_sms_feature() {
    let (app, pool, _guard) = common::test_app().await;

    let buyer = common::seed_user(&pool, common::DEALER, "s-ph@x.com", "customer", "user", true).await;
    let token = common::create_test_token(buyer, "s-ph@x.com", "customer", "user");

    let body = serde_json::json!({ "phone_number": "+15005550006" }).to_string();
    let (status, resp) =
        common::post_json_authed(&app, "/api/settings/phone", &body, common::DEALER, &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["message"].as_str().unwrap_or("").contains("not enabled"));
}

#[tokio::test]
async fn verify_without_a_pending_code_is_rejected() {
    let (app, pool, _guard) = common::test_app().await;

    let buyer = common::seed_user(&pool, common::DEALER, "s-ph2@x.com", "customer", "user", true).await;
    let token = common::create_test_token(buyer, "s-ph2@x.com", "customer", "user");

    let body = serde_json::json!({ "phone_number": "+15005550006", "code": "123456" }).to_string();
    let (status, resp) = common::post_json_authed(
        &app,
        "/api/settings/phone/verify",
        &body,
        common::DEALER,
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp["message"]
        .as_str()
        .unwrap_or("")
        .contains("No pending verification code"));
}

fn mailgun_payload(event: &str, recipient: &str, signing_key: Option<&str>) -> String {
    let timestamp = "1700000000";
    let token = "webhook-token";
    let signature = match signing_key {
        Some(key) => {
            use hmac::{Hmac, Mac};
            let mut mac = Hmac::<sha2::Sha256>::new_from_slice(key.as_bytes()).unwrap();
            mac.update(timestamp.as_bytes());
            mac.update(token.as_bytes());
            hex::encode(mac.finalize().into_bytes())
        }
        None => "deadbeef".to_string(),
    };
    serde_json::json!({
        "signature": { "timestamp": timestamp, "token": token, "signature": signature },
        "event-data": { "event": event, "recipient": recipient },
    })
    .to_string()
}

#[tokio::test]
async fn bounce_webhook_disables_email_notifications() {
    let (app, pool, _guard) = common::test_app().await;

    let buyer = common::seed_user(&pool, common::DEALER, "s-wh@x.com", "customer", "user", true).await;

    std::env::set_var("MAILGUN_WEBHOOK_SIGNING_KEY", "test-webhook-key");
    let body = mailgun_payload("failed", "s-wh@x.com", Some("test-webhook-key"));
    let (status, _) = common::post_no_dealer(&app, "/api/webhooks/mailgun", &body).await;
    std::env::remove_var("MAILGUN_WEBHOOK_SIGNING_KEY");
    assert_eq!(status, StatusCode::NO_CONTENT);

    let email_enabled: bool = sqlx::query_scalar(
        "SELECT email_enabled FROM notification_settings WHERE user_id = $1",
    )
    .bind(buyer)
    .fetch_one(&pool)
    .await
    .expect("settings row should exist after the webhook");
    assert_eq!(email_enabled, false);
}

#[tokio::test]
async fn webhook_with_bad_signature_is_rejected() {
    let (app, _pool, _guard) = common::test_app().await;

    std::env::set_var("MAILGUN_WEBHOOK_SIGNING_KEY", "test-webhook-key");
    let body = mailgun_payload("failed", "s-wh2@x.com", None);
    let (status, _) = common::post_no_dealer(&app, "/api/webhooks/mailgun", &body).await;
    std::env::remove_var("MAILGUN_WEBHOOK_SIGNING_KEY");
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhook_without_signing_key_is_rejected() {
    let (app, _pool, _guard) = common::test_app().await;

    std::env::remove_var("MAILGUN_WEBHOOK_SIGNING_KEY");
    let body = mailgun_payload("failed", "s-wh3@x.com", Some("some-key"));
    let (status, _) = common::post_no_dealer(&app, "/api/webhooks/mailgun", &body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
