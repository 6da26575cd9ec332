use chrono::{DateTime, Duration, Utc};
use homestead_types::{AppError, TrackingLinkResponse};
use sqlx::{Pool, Postgres};

use crate::auth::jwt::hash_token;
use crate::error_convert::SqlxErrorExt;

/// How long an issued tracking link stays valid.
const TOKEN_TTL_DAYS: i64 = 30;

/// Issue a tracking token for a delivery. The plaintext token is returned
/// once; only its hash is stored.
pub async fn issue(
    pool: &Pool<Postgres>,
    delivery_id: i64,
) -> Result<TrackingLinkResponse, AppError> {
    let token = uuid::Uuid::new_v4().to_string();
    let token_hash = hash_token(&token);
    let expires_at = Utc::now() + Duration::days(TOKEN_TTL_DAYS);

    sqlx::query("INSERT INTO tracking_tokens (delivery_id, token_hash, expires_at) VALUES ($1, $2, $3)")
        .bind(delivery_id)
        .bind(&token_hash)
        .bind(expires_at)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(TrackingLinkResponse { token, expires_at })
}

/// Resolve a plaintext token to its delivery. Expired or unknown tokens
/// are indistinguishable to the caller.
pub async fn resolve(pool: &Pool<Postgres>, token: &str) -> Result<i64, AppError> {
    let token_hash = hash_token(token);
    let row: Option<(i64, DateTime<Utc>)> = sqlx::query_as(
        "SELECT delivery_id, expires_at FROM tracking_tokens WHERE token_hash = $1",
    )
    .bind(&token_hash)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    match row {
        Some((delivery_id, expires_at)) if expires_at > Utc::now() => Ok(delivery_id),
        _ => Err(AppError::not_found("Tracking link not found or expired")),
    }
}

/// Revoke every tracking token for a delivery.
pub async fn revoke_for_delivery(pool: &Pool<Postgres>, delivery_id: i64) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM tracking_tokens WHERE delivery_id = $1")
        .bind(delivery_id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected())
}
