use homestead_types::{AppError, PaginatedResponse, UpdateProfileRequest, UserProfile};
use sqlx::{Pool, Postgres};

use crate::error_convert::SqlxErrorExt;

const PROFILE_COLUMNS: &str = "user_id, dealer_id, email, first_name, last_name, phone_number, \
     role, markup_percentage, approved, created_at, updated_at";

/// Fetch a profile by user ID, across tenants. Used by the session
/// manager, which works from JWT identity rather than tenant context.
pub async fn get_profile_by_user(
    pool: &Pool<Postgres>,
    user_id: i64,
) -> Result<UserProfile, AppError> {
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE user_id = $1");
    let row = sqlx::query_as::<_, UserProfile>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    row.ok_or_else(|| AppError::not_found("Profile not found"))
}

/// Fetch a profile within a dealership.
pub async fn find(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    user_id: i64,
) -> Result<Option<UserProfile>, AppError> {
    let sql =
        format!("SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE dealer_id = $1 AND user_id = $2");
    let row = sqlx::query_as::<_, UserProfile>(&sql)
        .bind(dealer_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

/// List profiles for a dealership, optionally filtered to unapproved accounts.
pub async fn list(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    pending_only: bool,
    page: i64,
    limit: i64,
) -> Result<PaginatedResponse<UserProfile>, AppError> {
    let offset = (page - 1) * limit;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_profiles WHERE dealer_id = $1 AND ($2 = false OR approved = false)",
    )
    .bind(dealer_id)
    .bind(pending_only)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let sql = format!(
        "SELECT {PROFILE_COLUMNS} FROM user_profiles \
         WHERE dealer_id = $1 AND ($2 = false OR approved = false) \
         ORDER BY created_at DESC LIMIT $3 OFFSET $4"
    );
    let rows = sqlx::query_as::<_, UserProfile>(&sql)
        .bind(dealer_id)
        .bind(pending_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(PaginatedResponse::new(rows, page, limit, total))
}

/// Partial profile update. Returns the updated row or None if not found.
pub async fn update(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    user_id: i64,
    req: UpdateProfileRequest,
) -> Result<Option<UserProfile>, AppError> {
    let sql = format!(
        r#"
        UPDATE user_profiles SET
            first_name        = COALESCE($3, first_name),
            last_name         = COALESCE($4, last_name),
            phone_number      = COALESCE($5, phone_number),
            role              = COALESCE($6, role),
            markup_percentage = COALESCE($7, markup_percentage),
            updated_at        = NOW()
        WHERE dealer_id = $1 AND user_id = $2
        RETURNING {PROFILE_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, UserProfile>(&sql)
        .bind(dealer_id)
        .bind(user_id)
        .bind(&req.first_name)
        .bind(&req.last_name)
        .bind(&req.phone_number)
        .bind(&req.role)
        .bind(req.markup_percentage)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    // Keep the account's role column in sync for JWT claims.
    if let (Some(profile), Some(role)) = (&row, &req.role) {
        sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
            .bind(profile.user_id)
            .bind(role)
            .execute(pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)?;
    }

    Ok(row)
}

/// Approve a batch of pending accounts. Returns how many rows changed.
pub async fn approve_many(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    user_ids: &[i64],
) -> Result<i64, AppError> {
    let result = sqlx::query(
        "UPDATE user_profiles SET approved = true, updated_at = NOW() \
         WHERE dealer_id = $1 AND user_id = ANY($2) AND approved = false",
    )
    .bind(dealer_id)
    .bind(user_ids)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() as i64)
}

/// Delete a profile and its account. Returns true if a row was deleted.
pub async fn delete(pool: &Pool<Postgres>, dealer_id: &str, user_id: i64) -> Result<bool, AppError> {
    // Verify tenant ownership before touching the account row.
    let exists: Option<i64> = sqlx::query_scalar(
        "SELECT user_id FROM user_profiles WHERE dealer_id = $1 AND user_id = $2",
    )
    .bind(dealer_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    if exists.is_none() {
        return Ok(false);
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}
