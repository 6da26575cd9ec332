use axum::{
    extract::{Path, Query, State},
    Json,
};
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use validator::Validate;

use homestead_types::{AppError, GpsBatchRequest, GpsBatchResponse, GpsPing, UserRole};

use crate::auth::extractors::{AuthRequired, DriverRequired};
use crate::gps_buffer::{BufferedPing, GpsBuffer};
use crate::repo;
use crate::tenant::DealerId;

#[utoipa::path(
    post,
    path = "/api/deliveries/{id}/gps",
    params(
        ("id" = i64, Path, description = "Delivery ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    request_body = GpsBatchRequest,
    responses(
        (status = 200, description = "Samples buffered", body = GpsBatchResponse),
        (status = 403, description = "Not the assigned driver", body = AppError),
        (status = 404, description = "Delivery not found", body = AppError)
    ),
    tag = "gps",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool, buffer, driver, payload))]
pub async fn submit_gps_batch(
    State(pool): State<Pool<Postgres>>,
    State(buffer): State<Arc<GpsBuffer>>,
    driver: DriverRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
    Json(payload): Json<GpsBatchRequest>,
) -> Result<Json<GpsBatchResponse>, AppError> {
    if payload.pings.is_empty() {
        return Err(AppError::bad_request("pings cannot be empty"));
    }

    repo::delivery::find_by_id(&pool, &dealer.0, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Delivery {} not found", id)))?;

    let role = UserRole::from_str_or_default(&driver.0.role);
    if role == UserRole::Driver
        && !repo::assignment::is_assigned_driver(&pool, id, driver.0.sub).await?
    {
        return Err(AppError::forbidden("Not assigned to this delivery"));
    }

    let mut accepted = 0;
    let mut rejected = 0;
    let mut buffer_full = false;

    for ping in &payload.pings {
        if ping.validate().is_err() {
            rejected += 1;
            continue;
        }
        buffer_full = buffer.push(BufferedPing {
            delivery_id: id,
            driver_id: driver.0.sub,
            lat: ping.lat,
            lng: ping.lng,
            speed_mph: ping.speed_mph,
            heading: ping.heading,
            recorded_at: ping.recorded_at,
        });
        accepted += 1;
    }

    // A full buffer means the periodic flush is falling behind; flush now
    // rather than let fresh samples push out old ones.
    if buffer_full {
        let _ = buffer.flush(&pool).await;
    }

    Ok(Json(GpsBatchResponse { accepted, rejected }))
}

#[derive(Debug, Clone, Default, serde::Deserialize, utoipa::IntoParams)]
pub struct TrailParams {
    /// Maximum samples to return (default 100, max 1000).
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/deliveries/{id}/gps",
    params(
        ("id" = i64, Path, description = "Delivery ID"),
        TrailParams,
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 200, description = "Recent GPS trail, newest first", body = Vec<GpsPing>),
        (status = 404, description = "Delivery not found", body = AppError)
    ),
    tag = "gps",
    security(("bearer_auth" = []))
)]
pub async fn get_trail(
    State(pool): State<Pool<Postgres>>,
    _auth: AuthRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
    Query(params): Query<TrailParams>,
) -> Result<Json<Vec<GpsPing>>, AppError> {
    repo::delivery::find_by_id(&pool, &dealer.0, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Delivery {} not found", id)))?;

    let limit = params.limit.unwrap_or(100).clamp(1, 1000);
    let trail = repo::gps::trail(&pool, id, limit).await?;
    Ok(Json(trail))
}
