use homestead_types::{AppError, CreateEstimateRequest, Estimate, PaginatedResponse, UpdateEstimateRequest};
use sqlx::{Pool, Postgres};

use crate::error_convert::SqlxErrorExt;

const ESTIMATE_COLUMNS: &str = "id, dealer_id, customer_id, home_description, base_price, \
     quoted_price, status, notes, created_at, updated_at";

pub async fn create(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    req: &CreateEstimateRequest,
    quoted_price: f64,
) -> Result<Estimate, AppError> {
    let sql = format!(
        r#"
        INSERT INTO estimates (dealer_id, customer_id, home_description, base_price, quoted_price, notes)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {ESTIMATE_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, Estimate>(&sql)
        .bind(dealer_id)
        .bind(req.customer_id)
        .bind(&req.home_description)
        .bind(req.base_price)
        .bind(quoted_price)
        .bind(&req.notes)
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

pub async fn find_by_id(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    id: i64,
) -> Result<Option<Estimate>, AppError> {
    let sql = format!("SELECT {ESTIMATE_COLUMNS} FROM estimates WHERE id = $1 AND dealer_id = $2");
    let row = sqlx::query_as::<_, Estimate>(&sql)
        .bind(id)
        .bind(dealer_id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

/// List estimates, optionally scoped to one customer.
pub async fn list(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    customer_id: Option<i64>,
    page: i64,
    limit: i64,
) -> Result<PaginatedResponse<Estimate>, AppError> {
    let offset = (page - 1) * limit;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM estimates WHERE dealer_id = $1 AND ($2::bigint IS NULL OR customer_id = $2)",
    )
    .bind(dealer_id)
    .bind(customer_id)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let sql = format!(
        "SELECT {ESTIMATE_COLUMNS} FROM estimates \
         WHERE dealer_id = $1 AND ($2::bigint IS NULL OR customer_id = $2) \
         ORDER BY created_at DESC LIMIT $3 OFFSET $4"
    );
    let rows = sqlx::query_as::<_, Estimate>(&sql)
        .bind(dealer_id)
        .bind(customer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(PaginatedResponse::new(rows, page, limit, total))
}

pub async fn update(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    id: i64,
    req: &UpdateEstimateRequest,
    quoted_price: Option<f64>,
) -> Result<Option<Estimate>, AppError> {
    let sql = format!(
        r#"
        UPDATE estimates SET
            home_description = COALESCE($3, home_description),
            base_price       = COALESCE($4, base_price),
            quoted_price     = COALESCE($5, quoted_price),
            status           = COALESCE($6, status),
            notes            = COALESCE($7, notes),
            updated_at       = NOW()
        WHERE id = $1 AND dealer_id = $2
        RETURNING {ESTIMATE_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, Estimate>(&sql)
        .bind(id)
        .bind(dealer_id)
        .bind(&req.home_description)
        .bind(req.base_price)
        .bind(quoted_price)
        .bind(&req.status)
        .bind(&req.notes)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

pub async fn delete(pool: &Pool<Postgres>, dealer_id: &str, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM estimates WHERE id = $1 AND dealer_id = $2")
        .bind(id)
        .bind(dealer_id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}
