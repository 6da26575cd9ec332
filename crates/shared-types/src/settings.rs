use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Per-user notification preferences. Email and SMS delivery are gated
/// on these flags in addition to the server-wide feature flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema, sqlx::FromRow)]
pub struct NotificationSettings {
    pub user_id: i64,
    pub email_enabled: bool,
    pub sms_enabled: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateNotificationSettingsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sms_enabled: Option<bool>,
}

/// Ask for an SMS verification code for a phone number.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema, Validate)]
pub struct SendPhoneCodeRequest {
    #[validate(length(min = 7, message = "Phone number is required"))]
    pub phone_number: String,
}

/// Confirm a phone number with the code received by SMS.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema, Validate)]
pub struct VerifyPhoneRequest {
    #[validate(length(min = 7, message = "Phone number is required"))]
    pub phone_number: String,
    #[validate(length(equal = 6, message = "Verification code must be 6 digits"))]
    pub code: String,
}
