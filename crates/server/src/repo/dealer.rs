use homestead_types::{AppError, Dealer, DealerStats, InitDealerRequest};
use sqlx::{Pool, Postgres};

use crate::error_convert::SqlxErrorExt;

/// Insert a dealership tenant if it doesn't already exist. Returns the row.
pub async fn init(pool: &Pool<Postgres>, req: InitDealerRequest) -> Result<Dealer, AppError> {
    let row = sqlx::query_as::<_, Dealer>(
        r#"
        INSERT INTO dealers (id, name, contact_email)
        VALUES ($1, $2, $3)
        ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, contact_email = EXCLUDED.contact_email
        RETURNING id, name, contact_email, created_at
        "#,
    )
    .bind(&req.id)
    .bind(&req.name)
    .bind(&req.contact_email)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

pub async fn find_by_id(pool: &Pool<Postgres>, dealer_id: &str) -> Result<Option<Dealer>, AppError> {
    let row = sqlx::query_as::<_, Dealer>(
        "SELECT id, name, contact_email, created_at FROM dealers WHERE id = $1",
    )
    .bind(dealer_id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

/// Aggregate counts for the dealer dashboard.
pub async fn stats(pool: &Pool<Postgres>, dealer_id: &str) -> Result<DealerStats, AppError> {
    let (user_count, delivery_count): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM user_profiles WHERE dealer_id = $1),
            (SELECT COUNT(*) FROM deliveries WHERE dealer_id = $1)
        "#,
    )
    .bind(dealer_id)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(DealerStats {
        dealer_id: dealer_id.to_string(),
        user_count,
        delivery_count,
    })
}
