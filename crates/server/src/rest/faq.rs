use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use sqlx::{Pool, Postgres};

use homestead_types::{AppError, CreateFaqRequest, Faq, UpdateFaqRequest, UserRole};

use crate::auth::extractors::{AdminRequired, MaybeAuth};
use crate::error_convert::ValidateRequest;
use crate::repo;
use crate::tenant::DealerId;

#[utoipa::path(
    post,
    path = "/api/faqs",
    params(("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")),
    request_body = CreateFaqRequest,
    responses(
        (status = 201, description = "FAQ created", body = Faq),
        (status = 403, description = "Admin role required", body = AppError)
    ),
    tag = "faqs",
    security(("bearer_auth" = []))
)]
pub async fn create_faq(
    State(pool): State<Pool<Postgres>>,
    _admin: AdminRequired,
    dealer: DealerId,
    Json(payload): Json<CreateFaqRequest>,
) -> Result<(StatusCode, Json<Faq>), AppError> {
    payload.validate_request()?;
    let faq = repo::faq::create(&pool, &dealer.0, payload).await?;
    Ok((StatusCode::CREATED, Json(faq)))
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct FaqListParams {
    /// Restrict results to one category, e.g. `financing`.
    pub category: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/faqs",
    params(
        FaqListParams,
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 200, description = "FAQ entries (unpublished entries visible to staff only)", body = Vec<Faq>)
    ),
    tag = "faqs"
)]
pub async fn list_faqs(
    State(pool): State<Pool<Postgres>>,
    auth: MaybeAuth,
    dealer: DealerId,
    Query(params): Query<FaqListParams>,
) -> Result<Json<Vec<Faq>>, AppError> {
    let is_staff = auth
        .0
        .map(|claims| UserRole::from_str_or_default(&claims.role).satisfies(&UserRole::Admin))
        .unwrap_or(false);

    let faqs = repo::faq::list(&pool, &dealer.0, params.category.as_deref(), is_staff).await?;
    Ok(Json(faqs))
}

#[utoipa::path(
    put,
    path = "/api/faqs/{id}",
    params(
        ("id" = i64, Path, description = "FAQ ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    request_body = UpdateFaqRequest,
    responses(
        (status = 200, description = "FAQ updated", body = Faq),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "faqs",
    security(("bearer_auth" = []))
)]
pub async fn update_faq(
    State(pool): State<Pool<Postgres>>,
    _admin: AdminRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateFaqRequest>,
) -> Result<Json<Faq>, AppError> {
    let faq = repo::faq::update(&pool, &dealer.0, id, payload)
        .await?
        .ok_or_else(|| AppError::not_found(format!("FAQ {} not found", id)))?;
    Ok(Json(faq))
}

#[utoipa::path(
    delete,
    path = "/api/faqs/{id}",
    params(
        ("id" = i64, Path, description = "FAQ ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 204, description = "FAQ deleted"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "faqs",
    security(("bearer_auth" = []))
)]
pub async fn delete_faq(
    State(pool): State<Pool<Postgres>>,
    _admin: AdminRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let deleted = repo::faq::delete(&pool, &dealer.0, id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!("FAQ {} not found", id)))
    }
}
