use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use crate::common;

async fn seed_ping(
    pool: &sqlx::Pool<sqlx::Postgres>,
    delivery_id: i64,
    driver_id: i64,
    lat: f64,
    lng: f64,
    recorded_at: &str,
) {
    sqlx::query(
        "INSERT INTO gps_pings (delivery_id, driver_id, lat, lng, recorded_at) \
         VALUES ($1, $2, $3, $4, $5::timestamptz)",
    )
    .bind(delivery_id)
    .bind(driver_id)
    .bind(lat)
    .bind(lng)
    .bind(recorded_at)
    .execute(pool)
    .await
    .expect("Failed to seed gps ping");
}

#[tokio::test]
async fn batch_reports_accepted_and_rejected_counts() {
    let (app, pool, _guard) = common::test_app().await;

    let driver = common::seed_user(&pool, common::DEALER, "g-drv@x.com", "driver", "user", true).await;
    let buyer = common::seed_user(&pool, common::DEALER, "g-b@x.com", "customer", "user", true).await;
    let delivery_id = common::seed_delivery(&pool, common::DEALER, buyer, "in_transit").await;
    common::seed_assignment(&pool, delivery_id, driver).await;

    let token = common::create_test_token(driver, "g-drv@x.com", "driver", "user");
    let body = serde_json::json!({
        "pings": [
            { "lat": 35.2, "lng": -97.4, "speed_mph": 45.0, "recorded_at": "2026-08-30T12:00:00Z" },
            { "lat": 95.0, "lng": -97.4, "recorded_at": "2026-08-30T12:00:05Z" },
            { "lat": 35.3, "lng": -197.0, "recorded_at": "2026-08-30T12:00:10Z" }
        ]
    })
    .to_string();
    let (status, resp) = common::post_json_authed(
        &app,
        &format!("/api/deliveries/{}/gps", delivery_id),
        &body,
        common::DEALER,
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["accepted"], 1);
    assert_eq!(resp["rejected"], 2);
}

#[tokio::test]
async fn empty_batch_rejected() {
    let (app, pool, _guard) = common::test_app().await;

    let driver = common::seed_user(&pool, common::DEALER, "g-drv2@x.com", "driver", "user", true).await;
    let buyer = common::seed_user(&pool, common::DEALER, "g-b2@x.com", "customer", "user", true).await;
    let delivery_id = common::seed_delivery(&pool, common::DEALER, buyer, "in_transit").await;
    common::seed_assignment(&pool, delivery_id, driver).await;

    let token = common::create_test_token(driver, "g-drv2@x.com", "driver", "user");
    let body = serde_json::json!({ "pings": [] }).to_string();
    let (status, _) = common::post_json_authed(
        &app,
        &format!("/api/deliveries/{}/gps", delivery_id),
        &body,
        common::DEALER,
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unassigned_driver_cannot_submit() {
    let (app, pool, _guard) = common::test_app().await;

    let driver = common::seed_user(&pool, common::DEALER, "g-drv3@x.com", "driver", "user", true).await;
    let buyer = common::seed_user(&pool, common::DEALER, "g-b3@x.com", "customer", "user", true).await;
    let delivery_id = common::seed_delivery(&pool, common::DEALER, buyer, "in_transit").await;

    let token = common::create_test_token(driver, "g-drv3@x.com", "driver", "user");
    let body = serde_json::json!({
        "pings": [{ "lat": 35.2, "lng": -97.4, "recorded_at": "2026-08-30T12:00:00Z" }]
    })
    .to_string();
    let (status, _) = common::post_json_authed(
        &app,
        &format!("/api/deliveries/{}/gps", delivery_id),
        &body,
        common::DEALER,
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn trail_returns_newest_first() {
    let (app, pool, _guard) = common::test_app().await;

    let driver = common::seed_user(&pool, common::DEALER, "g-drv4@x.com", "driver", "user", true).await;
    let buyer = common::seed_user(&pool, common::DEALER, "g-b4@x.com", "customer", "user", true).await;
    let delivery_id = common::seed_delivery(&pool, common::DEALER, buyer, "in_transit").await;

    seed_ping(&pool, delivery_id, driver, 35.10, -97.40, "2026-08-30T12:00:00Z").await;
    seed_ping(&pool, delivery_id, driver, 35.20, -97.45, "2026-08-30T12:05:00Z").await;

    let token = common::create_test_token(buyer, "g-b4@x.com", "customer", "user");
    let (status, trail) = common::get_authed(
        &app,
        &format!("/api/deliveries/{}/gps", delivery_id),
        common::DEALER,
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let points = trail.as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["lat"], 35.20);
    assert_eq!(points[1]["lat"], 35.10);
}

#[tokio::test]
async fn trail_limit_is_applied() {
    let (app, pool, _guard) = common::test_app().await;

    let driver = common::seed_user(&pool, common::DEALER, "g-drv5@x.com", "driver", "user", true).await;
    let buyer = common::seed_user(&pool, common::DEALER, "g-b5@x.com", "customer", "user", true).await;
    let delivery_id = common::seed_delivery(&pool, common::DEALER, buyer, "in_transit").await;

    for minute in 0..5 {
        seed_ping(
            &pool,
            delivery_id,
            driver,
            35.0 + minute as f64 * 0.01,
            -97.4,
            &format!("2026-08-30T12:0{}:00Z", minute),
        )
        .await;
    }

    let token = common::create_test_token(buyer, "g-b5@x.com", "customer", "user");
    let (status, trail) = common::get_authed(
        &app,
        &format!("/api/deliveries/{}/gps?limit=2", delivery_id),
        common::DEALER,
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trail.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn trail_for_unknown_delivery_404() {
    let (app, pool, _guard) = common::test_app().await;

    let buyer = common::seed_user(&pool, common::DEALER, "g-b6@x.com", "customer", "user", true).await;
    let token = common::create_test_token(buyer, "g-b6@x.com", "customer", "user");

    let (status, _) =
        common::get_authed(&app, "/api/deliveries/999999/gps", common::DEALER, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
