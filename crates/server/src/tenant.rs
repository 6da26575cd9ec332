use axum::{extract::FromRequestParts, http::request::Parts};
use homestead_types::AppError;

/// Extractor that resolves the dealership/tenant ID from the request.
///
/// Priority:
/// 1. `X-Dealer-ID` header
/// 2. Host subdomain (e.g., `sunrise.homestead.app` -> `sunrise`)
/// 3. `?dealer=xxx` query param
#[derive(Debug, Clone)]
pub struct DealerId(pub String);

impl DealerId {
    /// Sanitize a tenant ID to lowercase alphanumeric + hyphens.
    fn sanitize(raw: &str) -> String {
        raw.trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-')
            .collect()
    }
}

impl<S> FromRequestParts<S> for DealerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // 1. X-Dealer-ID header
        if let Some(val) = parts.headers.get("x-dealer-id") {
            if let Ok(s) = val.to_str() {
                let sanitized = Self::sanitize(s);
                if !sanitized.is_empty() {
                    return Ok(DealerId(sanitized));
                }
            }
        }

        // 2. Host subdomain
        if let Some(host) = parts.headers.get("host") {
            if let Ok(h) = host.to_str() {
                let parts_host: Vec<&str> = h.split('.').collect();
                if parts_host.len() >= 3 {
                    let sanitized = Self::sanitize(parts_host[0]);
                    if !sanitized.is_empty() {
                        return Ok(DealerId(sanitized));
                    }
                }
            }
        }

        // 3. Query parameter ?dealer=xxx
        if let Some(query) = &parts.uri.query() {
            for pair in query.split('&') {
                if let Some(val) = pair.strip_prefix("dealer=") {
                    let sanitized = Self::sanitize(val);
                    if !sanitized.is_empty() {
                        return Ok(DealerId(sanitized));
                    }
                }
            }
        }

        Err(AppError::bad_request("Missing required header: X-Dealer-ID"))
    }
}
