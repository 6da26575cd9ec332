use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};

use homestead_types::{
    AnalyticsEvent, AnalyticsQueryParams, AnalyticsSummary, AppError, TrackEventRequest,
};

use crate::auth::extractors::{AdminRequired, MaybeAuth};
use crate::error_convert::ValidateRequest;
use crate::repo;
use crate::tenant::DealerId;

#[utoipa::path(
    post,
    path = "/api/analytics/events",
    params(("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")),
    request_body = TrackEventRequest,
    responses(
        (status = 201, description = "Event recorded", body = AnalyticsEvent)
    ),
    tag = "analytics"
)]
pub async fn track_event(
    State(pool): State<Pool<Postgres>>,
    auth: MaybeAuth,
    dealer: DealerId,
    Json(payload): Json<TrackEventRequest>,
) -> Result<(StatusCode, Json<AnalyticsEvent>), AppError> {
    payload.validate_request()?;
    let user_id = auth.0.map(|claims| claims.sub);
    let event = repo::analytics::track(&pool, &dealer.0, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

#[utoipa::path(
    get,
    path = "/api/analytics/summary",
    params(
        AnalyticsQueryParams,
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 200, description = "Dashboard summary", body = AnalyticsSummary),
        (status = 403, description = "Admin role required", body = AppError)
    ),
    tag = "analytics",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool))]
pub async fn summary(
    State(pool): State<Pool<Postgres>>,
    _admin: AdminRequired,
    dealer: DealerId,
    Query(params): Query<AnalyticsQueryParams>,
) -> Result<Json<AnalyticsSummary>, AppError> {
    let total_events =
        repo::analytics::total_events(&pool, &dealer.0, params.from, params.to).await?;
    let events_by_type =
        repo::analytics::counts_by_type(&pool, &dealer.0, params.from, params.to).await?;
    let active_deliveries = repo::delivery::active_count(&pool, &dealer.0).await?;
    let pending_users = repo::analytics::pending_user_count(&pool, &dealer.0).await?;

    Ok(Json(AnalyticsSummary {
        total_events,
        events_by_type,
        active_deliveries,
        pending_users,
    }))
}
