use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};

use homestead_types::{AppError, AssignDriverRequest, DeliveryAssignment};

use crate::auth::extractors::AdminRequired;
use crate::repo;
use crate::tenant::DealerId;

/// Confirm the delivery belongs to this dealership before touching its
/// assignments (assignment rows carry no dealer column themselves).
async fn require_delivery(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    delivery_id: i64,
) -> Result<(), AppError> {
    repo::delivery::find_by_id(pool, dealer_id, delivery_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::not_found(format!("Delivery {} not found", delivery_id)))
}

#[utoipa::path(
    post,
    path = "/api/deliveries/{id}/assignment",
    params(
        ("id" = i64, Path, description = "Delivery ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    request_body = AssignDriverRequest,
    responses(
        (status = 200, description = "Driver assigned", body = DeliveryAssignment),
        (status = 404, description = "Delivery not found", body = AppError)
    ),
    tag = "deliveries",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool))]
pub async fn assign_driver(
    State(pool): State<Pool<Postgres>>,
    _admin: AdminRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
    Json(payload): Json<AssignDriverRequest>,
) -> Result<Json<DeliveryAssignment>, AppError> {
    require_delivery(&pool, &dealer.0, id).await?;
    let assignment = repo::assignment::assign(&pool, id, payload.driver_id).await?;
    Ok(Json(assignment))
}

#[utoipa::path(
    get,
    path = "/api/deliveries/{id}/assignment",
    params(
        ("id" = i64, Path, description = "Delivery ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 200, description = "Active assignment", body = DeliveryAssignment),
        (status = 404, description = "No active assignment", body = AppError)
    ),
    tag = "deliveries",
    security(("bearer_auth" = []))
)]
pub async fn get_assignment(
    State(pool): State<Pool<Postgres>>,
    _admin: AdminRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
) -> Result<Json<DeliveryAssignment>, AppError> {
    require_delivery(&pool, &dealer.0, id).await?;
    let assignment = repo::assignment::active_for_delivery(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("No active assignment for this delivery"))?;
    Ok(Json(assignment))
}

#[utoipa::path(
    delete,
    path = "/api/deliveries/{id}/assignment",
    params(
        ("id" = i64, Path, description = "Delivery ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 204, description = "Driver unassigned"),
        (status = 404, description = "No active assignment", body = AppError)
    ),
    tag = "deliveries",
    security(("bearer_auth" = []))
)]
pub async fn unassign_driver(
    State(pool): State<Pool<Postgres>>,
    _admin: AdminRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    require_delivery(&pool, &dealer.0, id).await?;
    let closed = repo::assignment::unassign(&pool, id).await?;
    if closed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("No active assignment for this delivery"))
    }
}
