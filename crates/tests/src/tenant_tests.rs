use axum::http::StatusCode;

use crate::common;

#[tokio::test]
async fn missing_dealer_header_returns_400() {
    let (app, _pool, _guard) = common::test_app().await;
    let (status, body) = common::get_no_dealer(&app, "/api/faqs").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap_or("")
        .contains("X-Dealer-ID"));
}

#[tokio::test]
async fn dealer_header_resolves_tenant() {
    let (app, _pool, _guard) = common::test_app().await;
    let (status, _body) = common::get_with_dealer(&app, "/api/faqs", common::DEALER).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn query_param_fallback_resolves_tenant() {
    let (app, _pool, _guard) = common::test_app().await;

    let req = axum::http::Request::builder()
        .method("GET")
        .uri(format!("/api/faqs?dealer={}", common::DEALER))
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, _body) = common::send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn host_subdomain_resolves_tenant() {
    let (app, _pool, _guard) = common::test_app().await;

    let req = axum::http::Request::builder()
        .method("GET")
        .uri("/api/faqs")
        .header("host", "sunrise.homestead.app")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, _body) = common::send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn dealer_header_is_sanitized() {
    let (app, _pool, _guard) = common::test_app().await;
    // Characters outside [a-z0-9-] are stripped before lookup.
    let (status, _body) = common::get_with_dealer(&app, "/api/faqs", " Sunrise ").await;
    assert_eq!(status, StatusCode::OK);
}
