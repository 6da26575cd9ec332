use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::common;

const DEVICE: &str = "kiosk-device-1";

/// Register an account pinned to a specific device ID, returning the
/// auth response body.
async fn register_on_device(app: &Router, email: &str, device: &str) -> Value {
    let body = serde_json::json!({
        "email": email,
        "password": "hunter2hunter2",
        "first_name": "Sales",
        "last_name": "Kiosk",
    })
    .to_string();

    let req = Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header("content-type", "application/json")
        .header("x-dealer-id", common::DEALER)
        .header("x-device-id", device)
        .body(Body::from(body))
        .unwrap();

    let (status, body) = common::send(app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

async fn get_sessions(app: &Router, device: &str, token: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("GET")
        .uri("/api/sessions")
        .header("x-device-id", device)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    common::send(app, req).await
}

async fn post_on_device(app: &Router, uri: &str, body: &str, device: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-device-id", device)
        .body(Body::from(body.to_string()))
        .unwrap();
    common::send(app, req).await
}

#[tokio::test]
async fn register_seeds_device_session_registry() {
    let (app, _pool, _guard) = common::test_app().await;

    let auth = register_on_device(&app, "kiosk1@example.com", DEVICE).await;
    let user_id = auth["user"]["id"].as_i64().unwrap();
    let token = auth["access_token"].as_str().unwrap();

    let (status, registry) = get_sessions(&app, DEVICE, token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(registry["device_id"], DEVICE);
    assert_eq!(registry["sessions"].as_array().unwrap().len(), 1);
    assert_eq!(registry["active_user_id"], user_id);
}

#[tokio::test]
async fn add_session_is_idempotent() {
    let (app, _pool, _guard) = common::test_app().await;

    let auth = register_on_device(&app, "kiosk2@example.com", DEVICE).await;
    let refresh = auth["refresh_token"].as_str().unwrap();

    let body = serde_json::json!({ "refresh_token": refresh }).to_string();
    let (status, registry) = post_on_device(&app, "/api/sessions", &body, DEVICE).await;
    assert_eq!(status, StatusCode::OK);
    // Re-adding the same account does not duplicate the entry.
    assert_eq!(registry["sessions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn two_accounts_share_one_device() {
    let (app, _pool, _guard) = common::test_app().await;

    let first = register_on_device(&app, "first@example.com", DEVICE).await;
    let second = register_on_device(&app, "second@example.com", DEVICE).await;
    let first_id = first["user"]["id"].as_i64().unwrap();
    let second_id = second["user"]["id"].as_i64().unwrap();
    let token = second["access_token"].as_str().unwrap();

    let (status, registry) = get_sessions(&app, DEVICE, token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(registry["sessions"].as_array().unwrap().len(), 2);
    // Adding a second account does not steal the active slot.
    assert_eq!(registry["active_user_id"], first_id);
    assert_ne!(first_id, second_id);
}

#[tokio::test]
async fn switch_session_returns_fresh_access_token() {
    let (app, _pool, _guard) = common::test_app().await;

    let first = register_on_device(&app, "alpha@example.com", DEVICE).await;
    register_on_device(&app, "beta@example.com", DEVICE).await;
    let first_id = first["user"]["id"].as_i64().unwrap();

    let body = serde_json::json!({ "user_id": first_id }).to_string();
    let (status, resp) = post_on_device(&app, "/api/sessions/switch", &body, DEVICE).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["user"]["id"], first_id);
    assert_eq!(resp["user"]["email"], "alpha@example.com");
    assert!(resp["access_token"].as_str().unwrap_or("").len() > 20);
}

#[tokio::test]
async fn safe_switch_skips_refresh_validation() {
    let (app, _pool, _guard) = common::test_app().await;

    let first = register_on_device(&app, "gamma@example.com", DEVICE).await;
    register_on_device(&app, "delta@example.com", DEVICE).await;
    let first_id = first["user"]["id"].as_i64().unwrap();

    let body = serde_json::json!({ "user_id": first_id, "safe": true }).to_string();
    let (status, resp) = post_on_device(&app, "/api/sessions/switch", &body, DEVICE).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["user"]["id"], first_id);
}

#[tokio::test]
async fn switch_to_unknown_session_404() {
    let (app, _pool, _guard) = common::test_app().await;

    register_on_device(&app, "lonely@example.com", DEVICE).await;

    let body = serde_json::json!({ "user_id": 999_999 }).to_string();
    let (status, _) = post_on_device(&app, "/api/sessions/switch", &body, DEVICE).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn remove_session_shrinks_registry() {
    let (app, _pool, _guard) = common::test_app().await;

    let first = register_on_device(&app, "rm1@example.com", DEVICE).await;
    register_on_device(&app, "rm2@example.com", DEVICE).await;
    let first_id = first["user"]["id"].as_i64().unwrap();

    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/api/sessions/{}", first_id))
        .header("x-device-id", DEVICE)
        .body(Body::empty())
        .unwrap();
    let (status, registry) = common::send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(registry["sessions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn clear_sessions_empties_device() {
    let (app, _pool, _guard) = common::test_app().await;

    register_on_device(&app, "clr1@example.com", DEVICE).await;
    let auth = register_on_device(&app, "clr2@example.com", DEVICE).await;
    let token = auth["access_token"].as_str().unwrap();

    let req = Request::builder()
        .method("DELETE")
        .uri("/api/sessions")
        .header("x-device-id", DEVICE)
        .body(Body::empty())
        .unwrap();
    let (status, _) = common::send(&app, req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, registry) = get_sessions(&app, DEVICE, token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(registry["sessions"].as_array().unwrap().len(), 0);
    assert!(registry["active_user_id"].is_null());
}

#[tokio::test]
async fn missing_device_id_rejected() {
    let (app, _pool, _guard) = common::test_app().await;

    let req = Request::builder()
        .method("POST")
        .uri("/api/sessions")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"refresh_token":"whatever"}"#))
        .unwrap();
    let (status, body) = common::send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap_or("").contains("device"));
}

#[tokio::test]
async fn concurrent_profile_fetches_issue_one_query() {
    let (_app, pool, _guard) = common::test_app().await;

    let user_id =
        common::seed_user(&pool, common::DEALER, "ss-dedup@x.com", "customer", "user", true).await;
    let manager = std::sync::Arc::new(homestead_server::auth::sessions::SessionManager::new(
        pool.clone(),
    ));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let mgr = std::sync::Arc::clone(&manager);
        handles.push(tokio::spawn(
            async move { mgr.fetch_user_profile(user_id, false).await },
        ));
    }
    for handle in handles {
        let profile = handle.await.unwrap().unwrap();
        assert_eq!(profile.user_id, user_id);
    }

    assert_eq!(manager.profile_query_count(), 1);
}

#[tokio::test]
async fn force_refresh_bypasses_the_profile_cache() {
    let (_app, pool, _guard) = common::test_app().await;

    let user_id =
        common::seed_user(&pool, common::DEALER, "ss-fresh@x.com", "customer", "user", true).await;
    let manager = homestead_server::auth::sessions::SessionManager::new(pool.clone());

    let before = manager.fetch_user_profile(user_id, false).await.unwrap();
    assert_eq!(before.first_name.as_deref(), Some("Test"));

    sqlx::query("UPDATE user_profiles SET first_name = 'Renamed' WHERE user_id = $1")
        .bind(user_id)
        .execute(&pool)
        .await
        .unwrap();

    // Cached read still sees the old name.
    let cached = manager.fetch_user_profile(user_id, false).await.unwrap();
    assert_eq!(cached.first_name.as_deref(), Some("Test"));
    assert_eq!(manager.profile_query_count(), 1);

    let fresh = manager.fetch_user_profile(user_id, true).await.unwrap();
    assert_eq!(fresh.first_name.as_deref(), Some("Renamed"));
    assert_eq!(manager.profile_query_count(), 2);
}

#[tokio::test]
async fn removed_session_does_not_serve_a_stale_profile() {
    let (_app, pool, _guard) = common::test_app().await;

    let user_id =
        common::seed_user(&pool, common::DEALER, "ss-stale@x.com", "customer", "user", true).await;
    let manager = homestead_server::auth::sessions::SessionManager::new(pool.clone());

    manager.fetch_user_profile(user_id, false).await.unwrap();
    sqlx::query("UPDATE user_profiles SET first_name = 'Renamed' WHERE user_id = $1")
        .bind(user_id)
        .execute(&pool)
        .await
        .unwrap();

    // Removing the session drops the cached profile, so the next fetch
    // goes back to the database even without force_refresh.
    manager.remove_session(DEVICE, user_id).await;
    let fresh = manager.fetch_user_profile(user_id, false).await.unwrap();
    assert_eq!(fresh.first_name.as_deref(), Some("Renamed"));
}

#[tokio::test]
async fn removing_a_session_revokes_its_refresh_token() {
    let (app, pool, _guard) = common::test_app().await;

    let auth = register_on_device(&app, "ss-revoke@x.com", DEVICE).await;
    let user_id = auth["user"]["id"].as_i64().unwrap();

    let live: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM refresh_tokens WHERE user_id = $1 AND revoked_at IS NULL",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(live, 1);

    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/api/sessions/{}", user_id))
        .header("x-device-id", DEVICE)
        .body(Body::empty())
        .unwrap();
    let (status, _) = common::send(&app, req).await;
    assert_eq!(status, StatusCode::OK);

    let live: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM refresh_tokens WHERE user_id = $1 AND revoked_at IS NULL",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(live, 0);
}

#[tokio::test]
async fn clearing_a_device_revokes_every_stored_token() {
    let (app, pool, _guard) = common::test_app().await;

    let first = register_on_device(&app, "ss-clr1@x.com", DEVICE).await;
    let second = register_on_device(&app, "ss-clr2@x.com", DEVICE).await;
    let ids = [
        first["user"]["id"].as_i64().unwrap(),
        second["user"]["id"].as_i64().unwrap(),
    ];

    let req = Request::builder()
        .method("DELETE")
        .uri("/api/sessions")
        .header("x-device-id", DEVICE)
        .body(Body::empty())
        .unwrap();
    let (status, _) = common::send(&app, req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    for id in ids {
        let live: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM refresh_tokens WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(live, 0, "user {} still has a live refresh token", id);
    }
}

#[tokio::test]
async fn switching_still_works_after_transparent_refresh() {
    let (app, _pool, _guard) = common::test_app().await;

    let auth = register_on_device(&app, "ss-rot@x.com", DEVICE).await;
    let user_id = auth["user"]["id"].as_i64().unwrap();
    let refresh_token = auth["refresh_token"].as_str().unwrap();

    // No access cookie, only the refresh cookie: the middleware rotates
    // the refresh token and must keep the device registry in step.
    let req = Request::builder()
        .method("GET")
        .uri("/api/auth/me")
        .header("x-dealer-id", common::DEALER)
        .header("x-device-id", DEVICE)
        .header(
            "cookie",
            format!("homestead_refresh={}", refresh_token),
        )
        .body(Body::empty())
        .unwrap();
    let (status, _) = common::send(&app, req).await;
    assert_eq!(status, StatusCode::OK);

    // The old token is revoked now; a switch validates the stored hash
    // against the database and must still succeed.
    let body = serde_json::json!({ "user_id": user_id, "safe": false }).to_string();
    let (status, resp) = post_on_device(&app, "/api/sessions/switch", &body, DEVICE).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["user"]["id"], user_id);

    // And the session was not evicted along the way.
    let token = auth["access_token"].as_str().unwrap();
    let (_, registry) = get_sessions(&app, DEVICE, token).await;
    assert_eq!(registry["sessions"].as_array().unwrap().len(), 1);
}
