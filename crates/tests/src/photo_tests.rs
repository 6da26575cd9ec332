use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use crate::common;

#[tokio::test]
async fn admin_attaches_and_lists_photos() {
    let (app, pool, _guard) = common::test_app().await;

    let buyer =
        common::seed_user(&pool, common::DEALER, "ph-cust@x.com", "customer", "user", true).await;
    let admin_id =
        common::seed_user(&pool, common::DEALER, "ph-adm@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "ph-adm@x.com", "admin", "admin");
    let delivery_id = common::seed_delivery(&pool, common::DEALER, buyer, "in_transit").await;

    let key = format!("{}/front-steps.jpg", delivery_id);
    let body = serde_json::json!({ "object_key": key, "caption": "Front steps set" }).to_string();
    let (status, photo) = common::post_json_authed(
        &app,
        &format!("/api/deliveries/{}/photos", delivery_id),
        &body,
        common::DEALER,
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(photo["object_key"], key.as_str());

    let (status, list) = common::get_authed(
        &app,
        &format!("/api/deliveries/{}/photos", delivery_id),
        common::DEALER,
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let photos = list.as_array().unwrap();
    assert_eq!(photos.len(), 1);
    // The URL is derived from the object key even when no bucket endpoint
    // is configured.
    assert!(photos[0]["url"].as_str().unwrap().ends_with(&key));
}

#[tokio::test]
async fn unassigned_driver_cannot_attach_photos() {
    let (app, pool, _guard) = common::test_app().await;

    let buyer =
        common::seed_user(&pool, common::DEALER, "ph-cust2@x.com", "customer", "user", true).await;
    let driver =
        common::seed_user(&pool, common::DEALER, "ph-drv@x.com", "driver", "user", true).await;
    let token = common::create_test_token(driver, "ph-drv@x.com", "driver", "user");
    let delivery_id = common::seed_delivery(&pool, common::DEALER, buyer, "in_transit").await;

    let body = serde_json::json!({ "object_key": "1/x.jpg" }).to_string();
    let (status, resp) = common::post_json_authed(
        &app,
        &format!("/api/deliveries/{}/photos", delivery_id),
        &body,
        common::DEALER,
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(resp["message"]
        .as_str()
        .unwrap_or("")
        .contains("assigned driver"));
}

#[tokio::test]
async fn assigned_driver_can_attach_photos() {
    let (app, pool, _guard) = common::test_app().await;

    let buyer =
        common::seed_user(&pool, common::DEALER, "ph-cust3@x.com", "customer", "user", true).await;
    let driver =
        common::seed_user(&pool, common::DEALER, "ph-drv2@x.com", "driver", "user", true).await;
    let token = common::create_test_token(driver, "ph-drv2@x.com", "driver", "user");
    let delivery_id = common::seed_delivery(&pool, common::DEALER, buyer, "in_transit").await;
    common::seed_assignment(&pool, delivery_id, driver).await;

    let body = serde_json::json!({ "object_key": "1/arrival.jpg" }).to_string();
    let (status, photo) = common::post_json_authed(
        &app,
        &format!("/api/deliveries/{}/photos", delivery_id),
        &body,
        common::DEALER,
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(photo["uploaded_by"], driver);
}

#[tokio::test]
async fn upload_url_requires_photo_storage_enabled() {
    let (app, pool, _guard) = common::test_app().await;

    let buyer =
        common::seed_user(&pool, common::DEALER, "ph-cust4@x.com", "customer", "user", true).await;
    let admin_id =
        common::seed_user(&pool, common::DEALER, "ph-adm2@x.com", "admin", "admin", true).await;
    let token = common::create_test_token(admin_id, "ph-adm2@x.com", "admin", "admin");
    let delivery_id = common::seed_delivery(&pool, common::DEALER, buyer, "scheduled").await;

    let body = serde_json::json!({ "content_type": "image/jpeg" }).to_string();
    let (status, resp) = common::post_json_authed(
        &app,
        &format!("/api/deliveries/{}/photos/upload-url", delivery_id),
        &body,
        common::DEALER,
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["message"].as_str().unwrap_or("").contains("not enabled"));
}
