use axum::{extract::State, http::StatusCode, Json};
use sqlx::{Pool, Postgres};

use homestead_types::{
    AppError, NotificationSettings, SendPhoneCodeRequest, UpdateNotificationSettingsRequest,
    VerifyPhoneRequest,
};

use crate::auth::extractors::AuthRequired;
use crate::config::feature_flags;
use crate::error_convert::ValidateRequest;
use crate::repo;
use crate::twilio;

#[utoipa::path(
    get,
    path = "/api/settings/notifications",
    responses(
        (status = 200, description = "Caller's notification settings", body = NotificationSettings)
    ),
    tag = "settings",
    security(("bearer_auth" = []))
)]
pub async fn get_settings(
    State(pool): State<Pool<Postgres>>,
    auth: AuthRequired,
) -> Result<Json<NotificationSettings>, AppError> {
    let settings = repo::settings::get_or_default(&pool, auth.0.sub).await?;
    Ok(Json(settings))
}

#[utoipa::path(
    put,
    path = "/api/settings/notifications",
    request_body = UpdateNotificationSettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = NotificationSettings)
    ),
    tag = "settings",
    security(("bearer_auth" = []))
)]
pub async fn update_settings(
    State(pool): State<Pool<Postgres>>,
    auth: AuthRequired,
    Json(payload): Json<UpdateNotificationSettingsRequest>,
) -> Result<Json<NotificationSettings>, AppError> {
    let settings = repo::settings::update(&pool, auth.0.sub, payload).await?;
    Ok(Json(settings))
}

#[utoipa::path(
    post,
    path = "/api/settings/phone",
    request_body = SendPhoneCodeRequest,
    responses(
        (status = 204, description = "Verification code sent"),
        (status = 400, description = "SMS notifications are not enabled", body = AppError),
        (status = 422, description = "Rate limited or invalid phone number", body = AppError)
    ),
    tag = "settings",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool, auth, payload))]
pub async fn send_phone_code(
    State(pool): State<Pool<Postgres>>,
    auth: AuthRequired,
    Json(payload): Json<SendPhoneCodeRequest>,
) -> Result<StatusCode, AppError> {
    payload.validate_request()?;
    if !feature_flags().twilio {
        return Err(AppError::bad_request("SMS notifications are not enabled"));
    }

    twilio::send_verification_code(&pool, auth.0.sub, &payload.phone_number).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/settings/phone/verify",
    request_body = VerifyPhoneRequest,
    responses(
        (status = 204, description = "Phone number verified"),
        (status = 422, description = "Wrong code, expired code, or too many attempts", body = AppError)
    ),
    tag = "settings",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool, auth, payload))]
pub async fn verify_phone_code(
    State(pool): State<Pool<Postgres>>,
    auth: AuthRequired,
    Json(payload): Json<VerifyPhoneRequest>,
) -> Result<StatusCode, AppError> {
    payload.validate_request()?;
    twilio::verify_code(&pool, auth.0.sub, &payload.phone_number, &payload.code).await?;
    Ok(StatusCode::NO_CONTENT)
}
