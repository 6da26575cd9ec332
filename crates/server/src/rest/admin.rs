use axum::{extract::State, http::StatusCode, Json};
use sqlx::{Pool, Postgres};

use homestead_types::{AppError, Dealer, DealerStats, InitDealerRequest};

use crate::auth::extractors::SuperAdminRequired;
use crate::repo;
use crate::tenant::DealerId;

#[utoipa::path(
    post,
    path = "/api/admin/dealers",
    request_body = InitDealerRequest,
    responses(
        (status = 201, description = "Dealership created or updated", body = Dealer),
        (status = 403, description = "Super admin role required", body = AppError)
    ),
    tag = "admin",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool, payload))]
pub async fn init_dealer(
    State(pool): State<Pool<Postgres>>,
    _super_admin: SuperAdminRequired,
    Json(payload): Json<InitDealerRequest>,
) -> Result<(StatusCode, Json<Dealer>), AppError> {
    if payload.id.trim().is_empty() {
        return Err(AppError::bad_request("Dealer ID cannot be empty"));
    }
    let dealer = repo::dealer::init(&pool, payload).await?;
    Ok((StatusCode::CREATED, Json(dealer)))
}

#[utoipa::path(
    get,
    path = "/api/admin/dealers/stats",
    params(("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")),
    responses(
        (status = 200, description = "Tenant statistics", body = DealerStats),
        (status = 403, description = "Super admin role required", body = AppError)
    ),
    tag = "admin",
    security(("bearer_auth" = []))
)]
pub async fn dealer_stats(
    State(pool): State<Pool<Postgres>>,
    _super_admin: SuperAdminRequired,
    dealer: DealerId,
) -> Result<Json<DealerStats>, AppError> {
    repo::dealer::find_by_id(&pool, &dealer.0)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Dealer {} not found", dealer.0)))?;

    let stats = repo::dealer::stats(&pool, &dealer.0).await?;
    Ok(Json(stats))
}
