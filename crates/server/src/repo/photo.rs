use homestead_types::{AppError, AttachPhotoRequest, DeliveryPhoto};
use sqlx::{Pool, Postgres};

use crate::error_convert::SqlxErrorExt;

const PHOTO_COLUMNS: &str = "id, delivery_id, uploaded_by, object_key, caption, created_at";

pub async fn attach(
    pool: &Pool<Postgres>,
    delivery_id: i64,
    uploaded_by: i64,
    req: AttachPhotoRequest,
) -> Result<DeliveryPhoto, AppError> {
    let sql = format!(
        "INSERT INTO delivery_photos (delivery_id, uploaded_by, object_key, caption) \
         VALUES ($1, $2, $3, $4) RETURNING {PHOTO_COLUMNS}"
    );
    let row = sqlx::query_as::<_, DeliveryPhoto>(&sql)
        .bind(delivery_id)
        .bind(uploaded_by)
        .bind(&req.object_key)
        .bind(&req.caption)
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

pub async fn list_for_delivery(
    pool: &Pool<Postgres>,
    delivery_id: i64,
) -> Result<Vec<DeliveryPhoto>, AppError> {
    let sql = format!(
        "SELECT {PHOTO_COLUMNS} FROM delivery_photos WHERE delivery_id = $1 ORDER BY created_at"
    );
    let rows = sqlx::query_as::<_, DeliveryPhoto>(&sql)
        .bind(delivery_id)
        .fetch_all(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(rows)
}

pub async fn delete(pool: &Pool<Postgres>, delivery_id: i64, photo_id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM delivery_photos WHERE id = $1 AND delivery_id = $2")
        .bind(photo_id)
        .bind(delivery_id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}
