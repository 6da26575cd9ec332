use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::AuthUser;

/// One entry in a device's session registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
pub struct SessionView {
    pub user_id: i64,
    pub email: String,
    pub role: String,
    /// True for the session currently active on the device.
    pub active: bool,
    pub added_at: DateTime<Utc>,
}

/// Full registry snapshot for a device.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SessionRegistryView {
    pub device_id: String,
    pub sessions: Vec<SessionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_user_id: Option<i64>,
}

/// Add (or re-add) a session for an already-authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AddSessionRequest {
    pub refresh_token: String,
}

/// Switch the device's active session to another registered user.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SwitchSessionRequest {
    pub user_id: i64,
    /// When true, the switch validates the target's refresh token in the
    /// background and rolls back on failure instead of failing up front.
    #[serde(default)]
    pub safe: bool,
}

/// Result of a session switch.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SwitchSessionResponse {
    pub user: AuthUser,
    pub access_token: String,
}

/// Login/refresh response carrying both tokens.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub user: AuthUser,
    pub access_token: String,
    pub refresh_token: String,
}
