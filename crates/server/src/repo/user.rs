use homestead_types::{AppError, User};
use sqlx::{Pool, Postgres};

use crate::error_convert::SqlxErrorExt;

/// Account row including the password hash. Never serialized to clients.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserWithPassword {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub tier: String,
}

/// Create an account plus its dealership profile in one transaction.
pub async fn create(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    email: &str,
    password_hash: &str,
    first_name: &str,
    last_name: &str,
    phone_number: Option<&str>,
) -> Result<User, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash)
        VALUES (LOWER($1), $2)
        RETURNING id, email, role, tier, created_at
        "#,
    )
    .bind(email)
    .bind(password_hash)
    .fetch_one(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    sqlx::query(
        r#"
        INSERT INTO user_profiles (user_id, dealer_id, email, first_name, last_name, phone_number)
        VALUES ($1, $2, LOWER($3), $4, $5, $6)
        "#,
    )
    .bind(user.id)
    .bind(dealer_id)
    .bind(email)
    .bind(first_name)
    .bind(last_name)
    .bind(phone_number)
    .execute(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(user)
}

pub async fn find_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Option<UserWithPassword>, AppError> {
    let row = sqlx::query_as::<_, UserWithPassword>(
        "SELECT id, email, password_hash, role, tier FROM users WHERE email = LOWER($1)",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

pub async fn find_by_id(pool: &Pool<Postgres>, id: i64) -> Result<Option<User>, AppError> {
    let row = sqlx::query_as::<_, User>(
        "SELECT id, email, role, tier, created_at FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

pub async fn update_password(
    pool: &Pool<Postgres>,
    user_id: i64,
    password_hash: &str,
) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(user_id)
        .bind(password_hash)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    Ok(())
}

/// Store a hashed refresh token, bound to the issuing device when known.
pub async fn store_refresh_token(
    pool: &Pool<Postgres>,
    user_id: i64,
    token_hash: &str,
    device_id: Option<&str>,
    expires_at: chrono::DateTime<chrono::Utc>,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO refresh_tokens (user_id, token_hash, device_id, expires_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(device_id)
    .bind(expires_at)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;
    Ok(())
}

/// Revoke one refresh token by hash. Returns true if a live token was revoked.
pub async fn revoke_refresh_token(
    pool: &Pool<Postgres>,
    token_hash: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = now() WHERE token_hash = $1 AND revoked_at IS NULL",
    )
    .bind(token_hash)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() > 0)
}

/// Revoke every live refresh token for a user (sign out everywhere).
pub async fn revoke_all_refresh_tokens(
    pool: &Pool<Postgres>,
    user_id: i64,
) -> Result<u64, AppError> {
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = now() WHERE user_id = $1 AND revoked_at IS NULL",
    )
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected())
}
