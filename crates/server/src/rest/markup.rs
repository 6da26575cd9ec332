use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};
use std::sync::Arc;

use homestead_types::{AppError, CustomerMarkup, UpsertMarkupRequest};

use crate::auth::extractors::AdminRequired;
use crate::auth::sessions::SessionManager;
use crate::error_convert::ValidateRequest;
use crate::repo;
use crate::tenant::DealerId;

#[utoipa::path(
    post,
    path = "/api/markups",
    params(("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")),
    request_body = UpsertMarkupRequest,
    responses(
        (status = 200, description = "Markup configuration saved", body = CustomerMarkup),
        (status = 403, description = "Admin role required", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "markups",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool, sessions, payload))]
pub async fn upsert_markup(
    State(pool): State<Pool<Postgres>>,
    State(sessions): State<Arc<SessionManager>>,
    _admin: AdminRequired,
    dealer: DealerId,
    Json(payload): Json<UpsertMarkupRequest>,
) -> Result<Json<CustomerMarkup>, AppError> {
    payload.validate_request()?;

    let user_id = payload.user_id;
    let markup = repo::markup::upsert(&pool, &dealer.0, payload).await?;

    // The memoized prices and cached profile are both stale now.
    crate::pricing::invalidate_user_prices(user_id);
    sessions.invalidate_profile(user_id);

    Ok(Json(markup))
}

#[utoipa::path(
    get,
    path = "/api/markups",
    params(("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")),
    responses(
        (status = 200, description = "Markup configurations", body = Vec<CustomerMarkup>),
        (status = 403, description = "Admin role required", body = AppError)
    ),
    tag = "markups",
    security(("bearer_auth" = []))
)]
pub async fn list_markups(
    State(pool): State<Pool<Postgres>>,
    _admin: AdminRequired,
    dealer: DealerId,
) -> Result<Json<Vec<CustomerMarkup>>, AppError> {
    let markups = repo::markup::list(&pool, &dealer.0).await?;
    Ok(Json(markups))
}

#[utoipa::path(
    delete,
    path = "/api/markups/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User whose markup row to delete"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 204, description = "Markup configuration deleted"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "markups",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool, sessions))]
pub async fn delete_markup(
    State(pool): State<Pool<Postgres>>,
    State(sessions): State<Arc<SessionManager>>,
    _admin: AdminRequired,
    dealer: DealerId,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let deleted = repo::markup::delete(&pool, &dealer.0, user_id).await?;
    if !deleted {
        return Err(AppError::not_found(format!(
            "No markup configuration for user {}",
            user_id
        )));
    }

    crate::pricing::invalidate_user_prices(user_id);
    sessions.invalidate_profile(user_id);

    Ok(StatusCode::NO_CONTENT)
}
