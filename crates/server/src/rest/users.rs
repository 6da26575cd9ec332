use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};
use std::sync::Arc;

use homestead_types::{
    normalize_pagination, AppError, BulkApproveRequest, BulkApproveResponse, PaginatedResponse,
    UpdateProfileRequest, UserProfile, UserRole,
};

use crate::auth::extractors::{AdminRequired, AuthRequired};
use crate::auth::sessions::SessionManager;
use crate::config::feature_flags;
use crate::repo;
use crate::tenant::DealerId;

#[derive(Debug, Clone, Default, serde::Deserialize, utoipa::IntoParams)]
pub struct UserListParams {
    /// When true, only unapproved accounts are returned.
    pub pending: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(
        UserListParams,
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 200, description = "User profiles", body = PaginatedResponse<UserProfile>),
        (status = 403, description = "Admin role required", body = AppError)
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(pool): State<Pool<Postgres>>,
    _admin: AdminRequired,
    dealer: DealerId,
    Query(params): Query<UserListParams>,
) -> Result<Json<PaginatedResponse<UserProfile>>, AppError> {
    let (page, limit) = normalize_pagination(params.page, params.limit);
    let profiles = repo::profile::list(
        &pool,
        &dealer.0,
        params.pending.unwrap_or(false),
        page,
        limit,
    )
    .await?;
    Ok(Json(profiles))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 200, description = "User profile", body = UserProfile),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(pool): State<Pool<Postgres>>,
    auth: AuthRequired,
    dealer: DealerId,
    Path(user_id): Path<i64>,
) -> Result<Json<UserProfile>, AppError> {
    // Non-staff may only read their own profile.
    let role = UserRole::from_str_or_default(&auth.0.role);
    if auth.0.sub != user_id && !role.satisfies(&UserRole::Admin) {
        return Err(AppError::forbidden("admin role or higher required"));
    }

    let profile = repo::profile::find(&pool, &dealer.0, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {} not found", user_id)))?;
    Ok(Json(profile))
}

#[utoipa::path(
    put,
    path = "/api/users/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool, sessions, auth, payload))]
pub async fn update_user(
    State(pool): State<Pool<Postgres>>,
    State(sessions): State<Arc<SessionManager>>,
    auth: AuthRequired,
    dealer: DealerId,
    Path(user_id): Path<i64>,
    Json(mut payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let role = UserRole::from_str_or_default(&auth.0.role);
    let is_staff = role.satisfies(&UserRole::Admin);
    if auth.0.sub != user_id && !is_staff {
        return Err(AppError::forbidden("admin role or higher required"));
    }

    // Role and markup changes are staff-only, even on one's own profile.
    if !is_staff {
        payload.role = None;
        payload.markup_percentage = None;
    }

    let markup_changed = payload.markup_percentage.is_some();
    let profile = repo::profile::update(&pool, &dealer.0, user_id, payload)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {} not found", user_id)))?;

    sessions.invalidate_profile(user_id);
    if markup_changed {
        crate::pricing::invalidate_user_prices(user_id);
    }

    Ok(Json(profile))
}

#[utoipa::path(
    post,
    path = "/api/users/approve",
    params(("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")),
    request_body = BulkApproveRequest,
    responses(
        (status = 200, description = "Accounts approved", body = BulkApproveResponse),
        (status = 403, description = "Admin role required", body = AppError)
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool, sessions, payload))]
pub async fn approve_users(
    State(pool): State<Pool<Postgres>>,
    State(sessions): State<Arc<SessionManager>>,
    _admin: AdminRequired,
    dealer: DealerId,
    Json(payload): Json<BulkApproveRequest>,
) -> Result<Json<BulkApproveResponse>, AppError> {
    if payload.user_ids.is_empty() {
        return Err(AppError::bad_request("user_ids cannot be empty"));
    }

    let approved = repo::profile::approve_many(&pool, &dealer.0, &payload.user_ids).await?;

    for user_id in &payload.user_ids {
        sessions.invalidate_profile(*user_id);
    }

    // Notify the newly approved accounts, honoring their preferences.
    if feature_flags().mailgun {
        let pool = pool.clone();
        let dealer_id = dealer.0.clone();
        let user_ids = payload.user_ids.clone();
        tokio::spawn(async move {
            for user_id in user_ids {
                if !repo::settings::email_enabled(&pool, user_id).await {
                    continue;
                }
                if let Ok(Some(profile)) = repo::profile::find(&pool, &dealer_id, user_id).await {
                    let name = profile.first_name.as_deref().unwrap_or("there").to_string();
                    crate::mailgun::send_account_approved_email(&profile.email, &name).await;
                }
            }
        });
    }

    Ok(Json(BulkApproveResponse { approved }))
}

#[utoipa::path(
    delete,
    path = "/api/users/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool, sessions))]
pub async fn delete_user(
    State(pool): State<Pool<Postgres>>,
    State(sessions): State<Arc<SessionManager>>,
    _admin: AdminRequired,
    dealer: DealerId,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let deleted = repo::profile::delete(&pool, &dealer.0, user_id).await?;
    if !deleted {
        return Err(AppError::not_found(format!("User {} not found", user_id)));
    }

    sessions.invalidate_profile(user_id);
    crate::pricing::invalidate_user_prices(user_id);
    repo::user::revoke_all_refresh_tokens(&pool, user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
