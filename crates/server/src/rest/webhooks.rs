use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use sqlx::{Pool, Postgres};

use homestead_types::AppError;

use crate::mailgun;
use crate::repo;

/// Signature block Mailgun attaches to every webhook delivery.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct MailgunSignature {
    pub timestamp: String,
    pub token: String,
    pub signature: String,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct MailgunEventData {
    pub event: String,
    #[serde(default)]
    pub recipient: Option<String>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct MailgunWebhookPayload {
    pub signature: MailgunSignature,
    #[serde(rename = "event-data")]
    pub event_data: MailgunEventData,
}

/// Mailgun delivery-event webhook.
///
/// Verifies the HMAC signature against `MAILGUN_WEBHOOK_SIGNING_KEY`, then
/// turns off email notifications for recipients whose address hard-bounced
/// or complained. All other events are acknowledged and ignored.
#[utoipa::path(
    post,
    path = "/api/webhooks/mailgun",
    request_body = MailgunWebhookPayload,
    responses(
        (status = 204, description = "Event processed"),
        (status = 401, description = "Signature verification failed", body = AppError)
    ),
    tag = "webhooks"
)]
#[tracing::instrument(skip(pool, payload))]
pub async fn mailgun_webhook(
    State(pool): State<Pool<Postgres>>,
    Json(payload): Json<MailgunWebhookPayload>,
) -> Result<StatusCode, AppError> {
    let signing_key = std::env::var("MAILGUN_WEBHOOK_SIGNING_KEY")
        .map_err(|_| AppError::unauthorized("Webhook signature could not be verified"))?;

    let sig = &payload.signature;
    if !mailgun::verify_webhook_signature(&signing_key, &sig.timestamp, &sig.token, &sig.signature)
    {
        return Err(AppError::unauthorized("Invalid webhook signature"));
    }

    let event = payload.event_data.event.as_str();
    if matches!(event, "failed" | "complained" | "unsubscribed") {
        if let Some(recipient) = payload.event_data.recipient.as_deref() {
            let affected = repo::settings::disable_email_for_address(&pool, recipient).await?;
            tracing::info!(event, recipient, affected, "Email notifications disabled by webhook");
        }
    } else {
        tracing::debug!(event, "Mailgun event acknowledged");
    }

    Ok(StatusCode::NO_CONTENT)
}
