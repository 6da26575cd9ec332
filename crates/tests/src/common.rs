use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware, Router,
};
use serde_json::Value;
use sqlx::{Pool, Postgres};
use tokio::sync::Mutex;
use tower::ServiceExt;

/// Global mutex ensuring tests run sequentially against the shared database.
/// Each test acquires this lock before truncating and seeding, preventing
/// concurrent tests from interfering with each other's data.
static TEST_MUTEX: std::sync::LazyLock<Mutex<()>> = std::sync::LazyLock::new(|| Mutex::new(()));

pub const DEALER: &str = "sunrise";
pub const OTHER_DEALER: &str = "ridgeline";

/// Build a test router backed by a real Postgres pool.
/// Acquires a global lock, truncates all tables, and re-seeds the dealers.
/// The returned `MutexGuard` must be held for the duration of the test to
/// prevent concurrent tests from truncating data.
pub async fn test_app() -> (Router, Pool<Postgres>, tokio::sync::MutexGuard<'static, ()>) {
    // Acquire the global test lock — held until the test completes
    let guard = TEST_MUTEX.lock().await;

    let _ = dotenvy::dotenv();
    if std::env::var("JWT_SECRET").is_err() {
        std::env::set_var("JWT_SECRET", "integration-test-secret");
    }

    let database_url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("TEST_DATABASE_URL or DATABASE_URL must be set for tests");

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    sqlx::query(
        "TRUNCATE users, user_profiles, refresh_tokens, password_resets, sms_verifications, \
         customer_markups, deliveries, delivery_assignments, delivery_photos, gps_pings, \
         tracking_tokens, faqs, conversations, chat_messages, analytics_events, estimates, \
         notification_settings, dealers CASCADE",
    )
    .execute(&pool)
    .await
    .expect("Failed to truncate");

    sqlx::query(
        "INSERT INTO dealers (id, name) VALUES \
         ('sunrise', 'Sunrise Homes (Test)'), ('ridgeline', 'Ridgeline Homes (Test)') \
         ON CONFLICT (id) DO NOTHING",
    )
    .execute(&pool)
    .await
    .expect("Failed to seed dealers");

    let state = homestead_server::db::AppState::new(pool.clone());
    // Include the permissive auth middleware so AuthRequired extractors work
    // when a JWT Bearer token is present; unauthenticated requests still pass through.
    let router = homestead_server::rest::api_router()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            homestead_server::auth::middleware::auth_middleware,
        ))
        .with_state(state);

    (router, pool, guard)
}

/// Seed a user account plus its dealership profile, returning the user ID.
pub async fn seed_user(
    pool: &Pool<Postgres>,
    dealer: &str,
    email: &str,
    role: &str,
    tier: &str,
    approved: bool,
) -> i64 {
    let user_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (email, password_hash, role, tier) VALUES ($1, 'x', $2, $3) RETURNING id",
    )
    .bind(email)
    .bind(role)
    .bind(tier)
    .fetch_one(pool)
    .await
    .expect("Failed to seed user");

    sqlx::query(
        "INSERT INTO user_profiles (user_id, dealer_id, email, first_name, last_name, role, approved) \
         VALUES ($1, $2, $3, 'Test', 'User', $4, $5)",
    )
    .bind(user_id)
    .bind(dealer)
    .bind(email)
    .bind(role)
    .bind(approved)
    .execute(pool)
    .await
    .expect("Failed to seed profile");

    user_id
}

/// Seed a delivery row directly, returning its ID.
pub async fn seed_delivery(
    pool: &Pool<Postgres>,
    dealer: &str,
    customer_id: i64,
    status: &str,
) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO deliveries (dealer_id, customer_id, home_description, destination_address, status) \
         VALUES ($1, $2, 'Single-wide 2BR', '100 Meadow Ln', $3) RETURNING id",
    )
    .bind(dealer)
    .bind(customer_id)
    .bind(status)
    .fetch_one(pool)
    .await
    .expect("Failed to seed delivery")
}

/// Assign a driver to a delivery directly.
pub async fn seed_assignment(pool: &Pool<Postgres>, delivery_id: i64, driver_id: i64) {
    sqlx::query(
        "INSERT INTO delivery_assignments (delivery_id, driver_id) VALUES ($1, $2)",
    )
    .bind(delivery_id)
    .bind(driver_id)
    .execute(pool)
    .await
    .expect("Failed to seed assignment");
}

/// Create a JWT access token for a seeded user.
/// Requires JWT_SECRET to be set (test_app sets a default).
pub fn create_test_token(user_id: i64, email: &str, role: &str, tier: &str) -> String {
    homestead_server::auth::jwt::create_access_token(user_id, email, role, tier)
        .expect("Failed to create test JWT")
}

/// POST JSON to a route with a dealer header.
pub async fn post_json(app: &Router, uri: &str, body: &str, dealer: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-dealer-id", dealer)
        .body(Body::from(body.to_string()))
        .unwrap();

    send(app, req).await
}

/// GET a route with a dealer header.
pub async fn get_with_dealer(app: &Router, uri: &str, dealer: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-dealer-id", dealer)
        .body(Body::empty())
        .unwrap();

    send(app, req).await
}

/// GET WITHOUT a dealer header.
pub async fn get_no_dealer(app: &Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, req).await
}

/// POST JSON WITHOUT a dealer header (for testing the missing header case).
pub async fn post_no_dealer(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    send(app, req).await
}

/// POST JSON with a dealer header and a JWT Bearer token.
pub async fn post_json_authed(
    app: &Router,
    uri: &str,
    body: &str,
    dealer: &str,
    token: &str,
) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-dealer-id", dealer)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .unwrap();

    send(app, req).await
}

/// PUT JSON with a dealer header and a JWT Bearer token.
pub async fn put_json_authed(
    app: &Router,
    uri: &str,
    body: &str,
    dealer: &str,
    token: &str,
) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-dealer-id", dealer)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .unwrap();

    send(app, req).await
}

/// PATCH JSON with a dealer header and a JWT Bearer token.
pub async fn patch_json_authed(
    app: &Router,
    uri: &str,
    body: &str,
    dealer: &str,
    token: &str,
) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("PATCH")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-dealer-id", dealer)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .unwrap();

    send(app, req).await
}

/// DELETE with a dealer header and a JWT Bearer token.
pub async fn delete_authed(
    app: &Router,
    uri: &str,
    dealer: &str,
    token: &str,
) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("x-dealer-id", dealer)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    send(app, req).await
}

/// GET with a dealer header and a JWT Bearer token.
pub async fn get_authed(
    app: &Router,
    uri: &str,
    dealer: &str,
    token: &str,
) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-dealer-id", dealer)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    send(app, req).await
}

/// Send an arbitrary request through the router and parse the response.
pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(req)
        .await
        .expect("Failed to send request");

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");

    let body: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&body_bytes).to_string(),
        ))
    };

    (status, body)
}
