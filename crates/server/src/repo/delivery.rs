use homestead_types::{
    AppError, CreateDeliveryRequest, Delivery, DeliveryStatus, DeliverySearchParams,
    PaginatedResponse, UpdateDeliveryRequest,
};
use sqlx::{Pool, Postgres};

use crate::error_convert::SqlxErrorExt;

const DELIVERY_COLUMNS: &str = "id, dealer_id, customer_id, status, home_description, \
     destination_address, destination_lat, destination_lng, scheduled_date, notes, \
     created_at, updated_at";

pub async fn create(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    req: CreateDeliveryRequest,
) -> Result<Delivery, AppError> {
    let sql = format!(
        r#"
        INSERT INTO deliveries
            (dealer_id, customer_id, home_description, destination_address,
             destination_lat, destination_lng, scheduled_date, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {DELIVERY_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, Delivery>(&sql)
        .bind(dealer_id)
        .bind(req.customer_id)
        .bind(&req.home_description)
        .bind(&req.destination_address)
        .bind(req.destination_lat)
        .bind(req.destination_lng)
        .bind(req.scheduled_date)
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
) -> Result<Option<Delivery>, AppError> {
    let sql = format!("SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE id = $1 AND dealer_id = $2");
    let row = sqlx::query_as::<_, Delivery>(&sql)
        .bind(id)
        .bind(dealer_id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

/// Fetch a delivery without tenant scoping. Used by the public tracking
/// endpoint, where the token itself grants access.
pub async fn find_by_id_unscoped(
    pool: &Pool<Postgres>,
    id: i64,
) -> Result<Option<Delivery>, AppError> {
    let sql = format!("SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE id = $1");
    let row = sqlx::query_as::<_, Delivery>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

/// List deliveries with optional status/customer/driver filters.
pub async fn search(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    params: &DeliverySearchParams,
    page: i64,
    limit: i64,
) -> Result<PaginatedResponse<Delivery>, AppError> {
    let offset = (page - 1) * limit;

    let filter = r#"
        dealer_id = $1
        AND ($2::text IS NULL OR status = $2)
        AND ($3::bigint IS NULL OR customer_id = $3)
        AND ($4::bigint IS NULL OR id IN (
            SELECT delivery_id FROM delivery_assignments
            WHERE driver_id = $4 AND unassigned_at IS NULL))
    "#;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM deliveries WHERE {filter}"))
        .bind(dealer_id)
        .bind(&params.status)
        .bind(params.customer_id)
        .bind(params.driver_id)
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    let sql = format!(
        "SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE {filter} \
         ORDER BY created_at DESC LIMIT $5 OFFSET $6"
    );
    let rows = sqlx::query_as::<_, Delivery>(&sql)
        .bind(dealer_id)
        .bind(&params.status)
        .bind(params.customer_id)
        .bind(params.driver_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(PaginatedResponse::new(rows, page, limit, total))
}

/// Partial update of delivery fields (never status; see `transition_status`).
pub async fn update(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    id: i64,
    req: UpdateDeliveryRequest,
) -> Result<Option<Delivery>, AppError> {
    let sql = format!(
        r#"
        UPDATE deliveries SET
            home_description    = COALESCE($3, home_description),
            destination_address = COALESCE($4, destination_address),
            destination_lat     = COALESCE($5, destination_lat),
            destination_lng     = COALESCE($6, destination_lng),
            scheduled_date      = COALESCE($7, scheduled_date),
            notes               = COALESCE($8, notes),
            updated_at          = NOW()
        WHERE id = $1 AND dealer_id = $2
        RETURNING {DELIVERY_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, Delivery>(&sql)
        .bind(id)
        .bind(dealer_id)
        .bind(&req.home_description)
        .bind(&req.destination_address)
        .bind(req.destination_lat)
        .bind(req.destination_lng)
        .bind(req.scheduled_date)
        .bind(&req.notes)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

/// Move a delivery through its guarded lifecycle. The current status is
/// read and checked inside one UPDATE so concurrent transitions can't
/// both succeed.
pub async fn transition_status(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    id: i64,
    next: DeliveryStatus,
) -> Result<Delivery, AppError> {
    let current = find_by_id(pool, dealer_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Delivery not found"))?;

    let from = DeliveryStatus::from_str_opt(&current.status)
        .ok_or_else(|| AppError::internal(format!("Unknown stored status: {}", current.status)))?;

    if !from.can_transition(next) {
        return Err(AppError::bad_request(format!(
            "Cannot move delivery from {} to {}",
            from.as_str(),
            next.as_str()
        )));
    }

    let sql = format!(
        "UPDATE deliveries SET status = $3, updated_at = NOW() \
         WHERE id = $1 AND dealer_id = $2 AND status = $4 \
         RETURNING {DELIVERY_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Delivery>(&sql)
        .bind(id)
        .bind(dealer_id)
        .bind(next.as_str())
        .bind(from.as_str())
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    row.ok_or_else(|| AppError::conflict("Delivery status changed concurrently"))
}

pub async fn delete(pool: &Pool<Postgres>, dealer_id: &str, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM deliveries WHERE id = $1 AND dealer_id = $2")
        .bind(id)
        .bind(dealer_id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}

/// Count deliveries currently moving, for the analytics summary.
pub async fn active_count(pool: &Pool<Postgres>, dealer_id: &str) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM deliveries WHERE dealer_id = $1 AND status IN ('scheduled', 'in_transit')",
    )
    .bind(dealer_id)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(count)
}
