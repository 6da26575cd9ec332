use homestead_types::{AppError, GpsPing, TrackingPosition};
use sqlx::{Pool, Postgres};

use crate::error_convert::SqlxErrorExt;
use crate::gps_buffer::BufferedPing;

const PING_COLUMNS: &str =
    "id, delivery_id, driver_id, lat, lng, speed_mph, heading, recorded_at, created_at";

/// Bulk-insert a flushed batch of buffered samples.
pub async fn insert_pings(pool: &Pool<Postgres>, batch: &[BufferedPing]) -> Result<(), AppError> {
    if batch.is_empty() {
        return Ok(());
    }

    // UNNEST keeps this one round trip regardless of batch size.
    let delivery_ids: Vec<i64> = batch.iter().map(|p| p.delivery_id).collect();
    let driver_ids: Vec<i64> = batch.iter().map(|p| p.driver_id).collect();
    let lats: Vec<f64> = batch.iter().map(|p| p.lat).collect();
    let lngs: Vec<f64> = batch.iter().map(|p| p.lng).collect();
    let speeds: Vec<Option<f64>> = batch.iter().map(|p| p.speed_mph).collect();
    let headings: Vec<Option<f64>> = batch.iter().map(|p| p.heading).collect();
    let recorded: Vec<chrono::DateTime<chrono::Utc>> =
        batch.iter().map(|p| p.recorded_at).collect();

    sqlx::query(
        r#"
        INSERT INTO gps_pings (delivery_id, driver_id, lat, lng, speed_mph, heading, recorded_at)
        SELECT * FROM UNNEST($1::bigint[], $2::bigint[], $3::float8[], $4::float8[],
                             $5::float8[], $6::float8[], $7::timestamptz[])
        "#,
    )
    .bind(&delivery_ids)
    .bind(&driver_ids)
    .bind(&lats)
    .bind(&lngs)
    .bind(&speeds)
    .bind(&headings)
    .bind(&recorded)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(())
}

/// Recent trail for a delivery, newest first.
pub async fn trail(
    pool: &Pool<Postgres>,
    delivery_id: i64,
    limit: i64,
) -> Result<Vec<GpsPing>, AppError> {
    let sql = format!(
        "SELECT {PING_COLUMNS} FROM gps_pings WHERE delivery_id = $1 \
         ORDER BY recorded_at DESC LIMIT $2"
    );
    let rows = sqlx::query_as::<_, GpsPing>(&sql)
        .bind(delivery_id)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(rows)
}

/// Most recent position for the public tracking view.
pub async fn last_position(
    pool: &Pool<Postgres>,
    delivery_id: i64,
) -> Result<Option<TrackingPosition>, AppError> {
    let row: Option<(f64, f64, chrono::DateTime<chrono::Utc>)> = sqlx::query_as(
        "SELECT lat, lng, recorded_at FROM gps_pings WHERE delivery_id = $1 \
         ORDER BY recorded_at DESC LIMIT 1",
    )
    .bind(delivery_id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row.map(|(lat, lng, recorded_at)| TrackingPosition {
        lat,
        lng,
        recorded_at,
    }))
}
