use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use sqlx::{Pool, Postgres};
use std::sync::Arc;

use homestead_types::{
    AppError, AuthResponse, AuthUser, ForgotPasswordRequest, LoginRequest, RegisterRequest,
    ResetPasswordRequest, UserProfile,
};

use crate::auth::extractors::AuthRequired;
use crate::auth::sessions::SessionManager;
use crate::auth::{cookies, jwt, password as pw};
use crate::config::feature_flags;
use crate::error_convert::ValidateRequest;
use crate::repo;
use crate::tenant::DealerId;

/// Resolve the device ID from the request, minting a fresh one when the
/// client has none yet. Returns the ID and whether it was newly minted
/// (so the handler knows to set the device cookie).
fn resolve_device_id(headers: &HeaderMap) -> (String, bool) {
    match cookies::extract_device_id(headers) {
        Some(id) => (id, false),
        None => (uuid::Uuid::new_v4().to_string(), true),
    }
}

fn auth_user_from_profile(user_id: i64, tier: &str, profile: &UserProfile) -> AuthUser {
    AuthUser {
        id: user_id,
        email: profile.email.clone(),
        role: profile.role.clone(),
        tier: tier.to_string(),
        first_name: profile.first_name.clone(),
        last_name: profile.last_name.clone(),
        phone_number: profile.phone_number.clone(),
        approved: profile.approved,
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    params(("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")),
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 409, description = "Email already registered", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, sessions, payload))]
pub async fn register(
    State(pool): State<Pool<Postgres>>,
    State(sessions): State<Arc<SessionManager>>,
    dealer: DealerId,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), AppError> {
    payload.validate_request()?;

    let password_hash =
        pw::hash_password(&payload.password).map_err(|e| AppError::internal(e.to_string()))?;

    let user = repo::user::create(
        &pool,
        &dealer.0,
        &payload.email,
        &password_hash,
        &payload.first_name,
        &payload.last_name,
        payload.phone_number.as_deref(),
    )
    .await?;

    let role = crate::auth::maybe_promote_admin(&pool, user.id, &user.email, user.role).await;
    let tier = if role == "super_admin" {
        "super_admin".to_string()
    } else {
        user.tier
    };

    let access_token = jwt::create_access_token(user.id, &user.email, &role, &tier)
        .map_err(|e| AppError::internal(e.to_string()))?;
    let (refresh_token, expires_at) = jwt::create_refresh_token(user.id, &user.email, &role, &tier)
        .map_err(|e| AppError::internal(e.to_string()))?;

    let (device_id, device_is_new) = resolve_device_id(&headers);
    repo::user::store_refresh_token(
        &pool,
        user.id,
        &jwt::hash_token(&refresh_token),
        Some(&device_id),
        expires_at,
    )
    .await?;

    // Register the new account on this device's session registry.
    let _guard = sessions.begin_sign_in();
    sessions.add_session(&device_id, &refresh_token).await?;

    if feature_flags().mailgun {
        let email = user.email.clone();
        let name = payload.first_name.clone();
        tokio::spawn(async move {
            crate::mailgun::send_welcome_email(&email, &name).await;
        });
    }

    let profile = sessions.fetch_user_profile(user.id, false).await?;

    let mut response_headers = HeaderMap::new();
    cookies::set_auth_cookies(&mut response_headers, &access_token, &refresh_token);
    if device_is_new {
        response_headers.append(header::SET_COOKIE, cookies::build_device_cookie(&device_id));
    }

    Ok((
        StatusCode::CREATED,
        response_headers,
        Json(AuthResponse {
            user: auth_user_from_profile(user.id, &tier, &profile),
            access_token,
            refresh_token,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = AppError)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, sessions, payload))]
pub async fn login(
    State(pool): State<Pool<Postgres>>,
    State(sessions): State<Arc<SessionManager>>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), AppError> {
    payload.validate_request()?;

    // Held for the whole handler: SignedIn events fired while this flag is
    // up are dropped, since this flow registers the session itself.
    let _guard = sessions.begin_sign_in();

    let user = repo::user::find_by_email(&pool, &payload.email)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid email or password"))?;

    let valid = pw::verify_password(&payload.password, &user.password_hash)
        .map_err(|e| AppError::internal(e.to_string()))?;
    if !valid {
        return Err(AppError::unauthorized("Invalid email or password"));
    }

    let role = crate::auth::maybe_promote_admin(&pool, user.id, &user.email, user.role).await;
    let tier = if role == "super_admin" {
        "super_admin".to_string()
    } else {
        user.tier
    };

    let access_token = jwt::create_access_token(user.id, &user.email, &role, &tier)
        .map_err(|e| AppError::internal(e.to_string()))?;
    let (refresh_token, expires_at) = jwt::create_refresh_token(user.id, &user.email, &role, &tier)
        .map_err(|e| AppError::internal(e.to_string()))?;

    let (device_id, device_is_new) = resolve_device_id(&headers);
    repo::user::store_refresh_token(
        &pool,
        user.id,
        &jwt::hash_token(&refresh_token),
        Some(&device_id),
        expires_at,
    )
    .await?;

    sessions.add_session(&device_id, &refresh_token).await?;

    // Force a fresh profile read — markup or approval may have changed
    // since the last cached fetch.
    let profile = sessions.fetch_user_profile(user.id, true).await?;

    let mut response_headers = HeaderMap::new();
    cookies::set_auth_cookies(&mut response_headers, &access_token, &refresh_token);
    if device_is_new {
        response_headers.append(header::SET_COOKIE, cookies::build_device_cookie(&device_id));
    }

    Ok((
        response_headers,
        Json(AuthResponse {
            user: auth_user_from_profile(user.id, &tier, &profile),
            access_token,
            refresh_token,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Signed out"),
        (status = 401, description = "Not authenticated", body = AppError)
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool, sessions, auth))]
pub async fn logout(
    State(pool): State<Pool<Postgres>>,
    State(sessions): State<Arc<SessionManager>>,
    auth: AuthRequired,
    headers: HeaderMap,
) -> Result<(HeaderMap, StatusCode), AppError> {
    // Revoke the presented refresh token; fall back to revoking all of the
    // user's tokens when the cookie is gone.
    match cookies::extract_refresh_token(&headers) {
        Some(token) => {
            repo::user::revoke_refresh_token(&pool, &jwt::hash_token(&token)).await?;
        }
        None => {
            repo::user::revoke_all_refresh_tokens(&pool, auth.0.sub).await?;
        }
    }

    if let Some(device_id) = cookies::extract_device_id(&headers) {
        sessions.remove_session(&device_id, auth.0.sub);
    }

    let mut response_headers = HeaderMap::new();
    cookies::clear_auth_cookies(&mut response_headers);
    Ok((response_headers, StatusCode::NO_CONTENT))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    params(
        ("force_refresh" = Option<bool>, Query, description = "Bypass the profile cache")
    ),
    responses(
        (status = 200, description = "Current user profile", body = UserProfile),
        (status = 401, description = "Not authenticated", body = AppError)
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(sessions): State<Arc<SessionManager>>,
    auth: AuthRequired,
    axum::extract::Query(params): axum::extract::Query<MeParams>,
) -> Result<Json<UserProfile>, AppError> {
    let profile = sessions
        .fetch_user_profile(auth.0.sub, params.force_refresh.unwrap_or(false))
        .await?;
    Ok(Json(profile))
}

#[derive(Debug, Clone, serde::Deserialize, utoipa::IntoParams)]
pub struct MeParams {
    pub force_refresh: Option<bool>,
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 204, description = "Reset email sent if the account exists")
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, payload))]
pub async fn forgot_password(
    State(pool): State<Pool<Postgres>>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<StatusCode, AppError> {
    payload.validate_request()?;

    // Always 204 — never reveal whether the email exists.
    if let Some(user) = repo::user::find_by_email(&pool, &payload.email).await? {
        if feature_flags().mailgun {
            match crate::mailgun::create_password_reset_token(&pool, user.id).await {
                Ok(token) => {
                    let email = user.email.clone();
                    tokio::spawn(async move {
                        crate::mailgun::send_password_reset_email(&email, &token).await;
                    });
                }
                Err(e) => tracing::error!(user_id = user.id, error = %e, "Failed to create reset token"),
            }
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 204, description = "Password updated"),
        (status = 400, description = "Invalid or expired token", body = AppError)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, sessions, payload))]
pub async fn reset_password(
    State(pool): State<Pool<Postgres>>,
    State(sessions): State<Arc<SessionManager>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    payload.validate_request()?;

    let user_id = crate::mailgun::consume_password_reset_token(&pool, &payload.token)
        .await
        .map_err(AppError::bad_request)?;

    let password_hash =
        pw::hash_password(&payload.new_password).map_err(|e| AppError::internal(e.to_string()))?;
    repo::user::update_password(&pool, user_id, &password_hash).await?;

    // Every existing session is now stale.
    repo::user::revoke_all_refresh_tokens(&pool, user_id).await?;
    sessions.invalidate_profile(user_id);

    Ok(StatusCode::NO_CONTENT)
}
