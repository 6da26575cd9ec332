use homestead_types::{AppError, CustomerMarkup, PricingTier, UpsertMarkupRequest};
use sqlx::{Pool, Postgres};

use crate::error_convert::SqlxErrorExt;
use crate::pricing::MarkupContext;

const MARKUP_COLUMNS: &str = "id, dealer_id, user_id, markup_percentage, tier_level, \
     super_admin_markup_percentage, created_at, updated_at";

/// Create or replace the markup row for a user within a dealership.
pub async fn upsert(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    req: UpsertMarkupRequest,
) -> Result<CustomerMarkup, AppError> {
    let tier_level = req.tier_level.unwrap_or_else(|| "user".to_string());
    let sql = format!(
        r#"
        INSERT INTO customer_markups
            (dealer_id, user_id, markup_percentage, tier_level, super_admin_markup_percentage)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (dealer_id, user_id) DO UPDATE SET
            markup_percentage = EXCLUDED.markup_percentage,
            tier_level = EXCLUDED.tier_level,
            super_admin_markup_percentage = EXCLUDED.super_admin_markup_percentage,
            updated_at = NOW()
        RETURNING {MARKUP_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, CustomerMarkup>(&sql)
        .bind(dealer_id)
        .bind(req.user_id)
        .bind(req.markup_percentage)
        .bind(&tier_level)
        .bind(req.super_admin_markup_percentage)
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

pub async fn find_by_user(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    user_id: i64,
) -> Result<Option<CustomerMarkup>, AppError> {
    let sql =
        format!("SELECT {MARKUP_COLUMNS} FROM customer_markups WHERE dealer_id = $1 AND user_id = $2");
    let row = sqlx::query_as::<_, CustomerMarkup>(&sql)
        .bind(dealer_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

pub async fn list(pool: &Pool<Postgres>, dealer_id: &str) -> Result<Vec<CustomerMarkup>, AppError> {
    let sql = format!(
        "SELECT {MARKUP_COLUMNS} FROM customer_markups WHERE dealer_id = $1 ORDER BY user_id"
    );
    let rows = sqlx::query_as::<_, CustomerMarkup>(&sql)
        .bind(dealer_id)
        .fetch_all(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(rows)
}

pub async fn delete(pool: &Pool<Postgres>, dealer_id: &str, user_id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM customer_markups WHERE dealer_id = $1 AND user_id = $2")
        .bind(dealer_id)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}

/// Resolve the pricing context for a user from their markup row, falling
/// back to tier defaults when no row exists.
pub async fn pricing_context(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    user_id: i64,
    jwt_tier: &str,
) -> Result<MarkupContext, AppError> {
    let tier = PricingTier::from_str_or_default(jwt_tier);
    match find_by_user(pool, dealer_id, user_id).await? {
        Some(row) => Ok(MarkupContext {
            tier: PricingTier::from_str_or_default(&row.tier_level),
            own_markup: row.markup_percentage,
            parent_markup: row.super_admin_markup_percentage,
        }),
        None => Ok(MarkupContext::default_for(tier)),
    }
}
