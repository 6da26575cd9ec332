use homestead_types::{AppError, NotificationSettings, UpdateNotificationSettingsRequest};
use sqlx::{Pool, Postgres};

use crate::error_convert::SqlxErrorExt;

const SETTINGS_COLUMNS: &str = "user_id, email_enabled, sms_enabled, updated_at";

/// Fetch settings, creating the default row on first access.
pub async fn get_or_default(
    pool: &Pool<Postgres>,
    user_id: i64,
) -> Result<NotificationSettings, AppError> {
    let sql = format!(
        r#"
        INSERT INTO notification_settings (user_id)
        VALUES ($1)
        ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
        RETURNING {SETTINGS_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, NotificationSettings>(&sql)
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

pub async fn update(
    pool: &Pool<Postgres>,
    user_id: i64,
    req: UpdateNotificationSettingsRequest,
) -> Result<NotificationSettings, AppError> {
    // Ensure the row exists before the partial update.
    get_or_default(pool, user_id).await?;

    let sql = format!(
        r#"
        UPDATE notification_settings SET
            email_enabled = COALESCE($2, email_enabled),
            sms_enabled   = COALESCE($3, sms_enabled),
            updated_at    = NOW()
        WHERE user_id = $1
        RETURNING {SETTINGS_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, NotificationSettings>(&sql)
        .bind(user_id)
        .bind(req.email_enabled)
        .bind(req.sms_enabled)
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

/// Turn off email notifications for every account using this address.
/// Used by the delivery-failure webhook; returns the number of accounts
/// affected.
pub async fn disable_email_for_address(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<u64, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO notification_settings (user_id, email_enabled)
        SELECT id, false FROM users WHERE email = $1
        ON CONFLICT (user_id) DO UPDATE SET email_enabled = false, updated_at = NOW()
        "#,
    )
    .bind(email)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected())
}

/// Whether email notifications are enabled for a user. Missing row means
/// the default: email on.
pub async fn email_enabled(pool: &Pool<Postgres>, user_id: i64) -> bool {
    sqlx::query_scalar::<_, bool>(
        "SELECT email_enabled FROM notification_settings WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .ok()
    .flatten()
    .unwrap_or(true)
}
