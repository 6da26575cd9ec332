use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Markup configuration row for a reseller account.
///
/// `super_admin_markup_percentage` is the markup of the account's parent
/// in the reseller hierarchy, denormalized onto the row so a single fetch
/// is enough to price for any tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema, sqlx::FromRow)]
pub struct CustomerMarkup {
    pub id: i64,
    pub dealer_id: String,
    pub user_id: i64,
    pub markup_percentage: f64,
    pub tier_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub super_admin_markup_percentage: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create or replace markup configuration for a user.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema, Validate)]
pub struct UpsertMarkupRequest {
    pub user_id: i64,
    #[validate(range(min = 0.0, max = 500.0, message = "Markup must be between 0 and 500"))]
    pub markup_percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 500.0, message = "Markup must be between 0 and 500"))]
    pub super_admin_markup_percentage: Option<f64>,
}
