use chrono::{DateTime, Utc};
use homestead_types::{AnalyticsEvent, AppError, EventCount, TrackEventRequest};
use sqlx::{Pool, Postgres};

use crate::error_convert::SqlxErrorExt;

const EVENT_COLUMNS: &str = "id, dealer_id, user_id, event_type, properties, created_at";

pub async fn track(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    user_id: Option<i64>,
    req: TrackEventRequest,
) -> Result<AnalyticsEvent, AppError> {
    let sql = format!(
        "INSERT INTO analytics_events (dealer_id, user_id, event_type, properties) \
         VALUES ($1, $2, $3, $4) RETURNING {EVENT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, AnalyticsEvent>(&sql)
        .bind(dealer_id)
        .bind(user_id)
        .bind(&req.event_type)
        .bind(&req.properties)
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

/// Event counts grouped by type within an optional date range.
pub async fn counts_by_type(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Vec<EventCount>, AppError> {
    let rows = sqlx::query_as::<_, EventCount>(
        r#"
        SELECT event_type, COUNT(*) AS count
        FROM analytics_events
        WHERE dealer_id = $1
          AND ($2::timestamptz IS NULL OR created_at >= $2)
          AND ($3::timestamptz IS NULL OR created_at < $3)
        GROUP BY event_type
        ORDER BY count DESC
        "#,
    )
    .bind(dealer_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(rows)
}

pub async fn total_events(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM analytics_events
        WHERE dealer_id = $1
          AND ($2::timestamptz IS NULL OR created_at >= $2)
          AND ($3::timestamptz IS NULL OR created_at < $3)
        "#,
    )
    .bind(dealer_id)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(count)
}

pub async fn pending_user_count(pool: &Pool<Postgres>, dealer_id: &str) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_profiles WHERE dealer_id = $1 AND approved = false",
    )
    .bind(dealer_id)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(count)
}
