use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use sqlx::{Pool, Postgres};

use super::cookies::{self};
use super::jwt::{self, hash_token, validate_access_token, validate_refresh_token};
use super::sessions::SessionManager;
use crate::db::AppState;

/// Permissive auth middleware that handles authentication and cookie management.
///
/// On each request:
/// 1. Validates the access token from cookies (or Bearer header fallback)
/// 2. If expired, attempts transparent refresh using the refresh cookie
/// 3. Applies refreshed cookies to the response
///
/// Does NOT reject unauthenticated requests — downstream extractors decide
/// authorization.
pub async fn auth_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let headers = req.headers().clone();
    let mut refresh_cookies: Option<(String, String)> = None;

    // Validate access token and insert Claims into extensions
    let access_token = cookies::extract_access_token(&headers);
    let mut needs_refresh = access_token.is_none();

    if let Some(token) = access_token {
        match validate_access_token(&token) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
            }
            Err(_) => {
                needs_refresh = true;
            }
        }
    }

    // Transparent refresh: access token missing (cookie expired) or invalid
    if needs_refresh {
        if let Some(refresh_token) = cookies::extract_refresh_token(&headers) {
            if let Some((new_access, new_refresh)) =
                try_transparent_refresh(&state.pool, &state.sessions, &refresh_token, &mut req)
                    .await
            {
                refresh_cookies = Some((new_access, new_refresh));
            }
        }
    }

    let mut response = next.run(req).await;

    // Apply cookies from transparent refresh
    if let Some((access, refresh)) = refresh_cookies {
        cookies::set_auth_cookies(response.headers_mut(), &access, &refresh);
    }

    response
}

/// Attempt to transparently refresh the session using the refresh token.
/// On success: inserts new Claims into request extensions and returns
/// the new token pair for the middleware to set as cookies.
async fn try_transparent_refresh(
    pool: &Pool<Postgres>,
    sessions: &SessionManager,
    refresh_token: &str,
    req: &mut Request,
) -> Option<(String, String)> {
    // Use validate_refresh_token — only accepts tokens with typ: "refresh"
    let claims = validate_refresh_token(refresh_token).ok()?;

    // Look up by hash, not raw token — the DB stores SHA-256 hashes
    let token_hash = hash_token(refresh_token);
    let stored: Option<(i64, Option<chrono::DateTime<chrono::Utc>>)> = sqlx::query_as(
        "SELECT id, revoked_at FROM refresh_tokens WHERE token_hash = $1 AND user_id = $2",
    )
    .bind(&token_hash)
    .bind(claims.sub)
    .fetch_optional(pool)
    .await
    .ok()?;
    let (stored_id, revoked_at) = stored?;

    if revoked_at.is_some() {
        return None;
    }

    // Revoke old refresh token (rotation)
    let _ = sqlx::query("UPDATE refresh_tokens SET revoked_at = now() WHERE id = $1")
        .bind(stored_id)
        .execute(pool)
        .await;

    let new_access =
        jwt::create_access_token(claims.sub, &claims.email, &claims.role, &claims.tier).ok()?;
    let (new_refresh, expires_at) =
        jwt::create_refresh_token(claims.sub, &claims.email, &claims.role, &claims.tier).ok()?;

    // Store the hash of the new refresh token, preserving the device binding
    let new_refresh_hash = hash_token(&new_refresh);
    let device_id = cookies::extract_device_id(req.headers());
    let _ = sqlx::query(
        "INSERT INTO refresh_tokens (user_id, token_hash, device_id, expires_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(claims.sub)
    .bind(&new_refresh_hash)
    .bind(&device_id)
    .bind(expires_at)
    .execute(pool)
    .await;

    // Keep the device registry coherent: any stored session for this user
    // now points at the rotated token, not the revoked one.
    sessions.note_token_rotation(device_id.as_deref(), claims.sub, &new_refresh_hash);

    // Validate the new access token to get fresh claims
    let new_claims = validate_access_token(&new_access).ok()?;
    req.extensions_mut().insert(new_claims);

    Some((new_access, new_refresh))
}
