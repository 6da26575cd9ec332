use homestead_types::{AppError, DeliveryAssignment};
use sqlx::{Pool, Postgres};

use crate::error_convert::SqlxErrorExt;

const ASSIGNMENT_COLUMNS: &str = "id, delivery_id, driver_id, assigned_at, unassigned_at";

/// Assign a driver, closing any existing active assignment first so a
/// delivery never has two drivers at once.
pub async fn assign(
    pool: &Pool<Postgres>,
    delivery_id: i64,
    driver_id: i64,
) -> Result<DeliveryAssignment, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    sqlx::query(
        "UPDATE delivery_assignments SET unassigned_at = now() \
         WHERE delivery_id = $1 AND unassigned_at IS NULL",
    )
    .bind(delivery_id)
    .execute(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let sql = format!(
        "INSERT INTO delivery_assignments (delivery_id, driver_id) VALUES ($1, $2) \
         RETURNING {ASSIGNMENT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, DeliveryAssignment>(&sql)
        .bind(delivery_id)
        .bind(driver_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(row)
}

/// The currently active assignment for a delivery, if any.
pub async fn active_for_delivery(
    pool: &Pool<Postgres>,
    delivery_id: i64,
) -> Result<Option<DeliveryAssignment>, AppError> {
    let sql = format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM delivery_assignments \
         WHERE delivery_id = $1 AND unassigned_at IS NULL"
    );
    let row = sqlx::query_as::<_, DeliveryAssignment>(&sql)
        .bind(delivery_id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

/// Close the active assignment. Returns true if one was open.
pub async fn unassign(pool: &Pool<Postgres>, delivery_id: i64) -> Result<bool, AppError> {
    let result = sqlx::query(
        "UPDATE delivery_assignments SET unassigned_at = now() \
         WHERE delivery_id = $1 AND unassigned_at IS NULL",
    )
    .bind(delivery_id)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}

/// True when the driver holds the active assignment for the delivery.
pub async fn is_assigned_driver(
    pool: &Pool<Postgres>,
    delivery_id: i64,
    driver_id: i64,
) -> Result<bool, AppError> {
    let exists: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM delivery_assignments \
         WHERE delivery_id = $1 AND driver_id = $2 AND unassigned_at IS NULL",
    )
    .bind(delivery_id)
    .bind(driver_id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(exists.is_some())
}
