use axum::{extract::Path, extract::State, http::HeaderMap, http::StatusCode, Json};
use std::sync::Arc;

use homestead_types::{
    AddSessionRequest, AppError, AuthUser, SessionRegistryView, SwitchSessionRequest,
    SwitchSessionResponse,
};

use crate::auth::cookies;
use crate::auth::extractors::AuthRequired;
use crate::auth::jwt;
use crate::auth::sessions::SessionManager;

fn device_id_required(headers: &HeaderMap) -> Result<String, AppError> {
    cookies::extract_device_id(headers)
        .ok_or_else(|| AppError::bad_request("Missing device cookie or X-Device-ID header"))
}

#[utoipa::path(
    get,
    path = "/api/sessions",
    responses(
        (status = 200, description = "Sessions registered on this device", body = SessionRegistryView),
        (status = 400, description = "No device ID", body = AppError)
    ),
    tag = "sessions",
    security(("bearer_auth" = []))
)]
pub async fn list_sessions(
    State(sessions): State<Arc<SessionManager>>,
    _auth: AuthRequired,
    headers: HeaderMap,
) -> Result<Json<SessionRegistryView>, AppError> {
    let device_id = device_id_required(&headers)?;
    Ok(Json(sessions.registry_view(&device_id)))
}

#[utoipa::path(
    post,
    path = "/api/sessions",
    request_body = AddSessionRequest,
    responses(
        (status = 200, description = "Session registered", body = SessionRegistryView),
        (status = 401, description = "Invalid refresh token", body = AppError)
    ),
    tag = "sessions"
)]
#[tracing::instrument(skip(sessions, payload, headers))]
pub async fn add_session(
    State(sessions): State<Arc<SessionManager>>,
    headers: HeaderMap,
    Json(payload): Json<AddSessionRequest>,
) -> Result<Json<SessionRegistryView>, AppError> {
    let device_id = device_id_required(&headers)?;
    sessions
        .add_session(&device_id, &payload.refresh_token)
        .await?;
    Ok(Json(sessions.registry_view(&device_id)))
}

#[utoipa::path(
    post,
    path = "/api/sessions/switch",
    request_body = SwitchSessionRequest,
    responses(
        (status = 200, description = "Active session switched", body = SwitchSessionResponse),
        (status = 401, description = "Target session is no longer valid", body = AppError),
        (status = 404, description = "Session not found on this device", body = AppError)
    ),
    tag = "sessions"
)]
#[tracing::instrument(skip(sessions, headers))]
pub async fn switch_session(
    State(sessions): State<Arc<SessionManager>>,
    headers: HeaderMap,
    Json(payload): Json<SwitchSessionRequest>,
) -> Result<(HeaderMap, Json<SwitchSessionResponse>), AppError> {
    let device_id = device_id_required(&headers)?;

    let entry = if payload.safe {
        sessions.switch_to_session_safe(&device_id, payload.user_id)?
    } else {
        sessions.switch_to_session(&device_id, payload.user_id).await?
    };

    let access_token = jwt::create_access_token(entry.user_id, &entry.email, &entry.role, &entry.tier)
        .map_err(|e| AppError::internal(e.to_string()))?;

    let profile = sessions.fetch_user_profile(entry.user_id, false).await?;

    let mut response_headers = HeaderMap::new();
    response_headers.append(
        axum::http::header::SET_COOKIE,
        cookies::build_access_cookie(&access_token, jwt::access_token_expiry_minutes()),
    );

    Ok((
        response_headers,
        Json(SwitchSessionResponse {
            user: AuthUser {
                id: entry.user_id,
                email: profile.email,
                role: profile.role,
                tier: entry.tier,
                first_name: profile.first_name,
                last_name: profile.last_name,
                phone_number: profile.phone_number,
                approved: profile.approved,
            },
            access_token,
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{user_id}",
    params(("user_id" = i64, Path, description = "User whose session to remove")),
    responses(
        (status = 200, description = "Session removed", body = SessionRegistryView),
        (status = 400, description = "No device ID", body = AppError)
    ),
    tag = "sessions"
)]
pub async fn remove_session(
    State(sessions): State<Arc<SessionManager>>,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
) -> Result<Json<SessionRegistryView>, AppError> {
    let device_id = device_id_required(&headers)?;
    sessions.remove_session(&device_id, user_id).await;
    Ok(Json(sessions.registry_view(&device_id)))
}

#[utoipa::path(
    delete,
    path = "/api/sessions",
    responses(
        (status = 204, description = "All sessions on this device removed"),
        (status = 400, description = "No device ID", body = AppError)
    ),
    tag = "sessions"
)]
pub async fn clear_sessions(
    State(sessions): State<Arc<SessionManager>>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let device_id = device_id_required(&headers)?;
    sessions.clear_all(&device_id).await;
    Ok(StatusCode::NO_CONTENT)
}
