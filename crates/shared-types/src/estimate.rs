use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Customer estimate request for a home.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema, sqlx::FromRow)]
pub struct Estimate {
    pub id: i64,
    pub dealer_id: String,
    pub customer_id: i64,
    pub home_description: String,
    /// Dealer cost before markup, visible to staff only.
    pub base_price: f64,
    /// Price quoted to the customer after tiered markup.
    pub quoted_price: f64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema, Validate)]
pub struct CreateEstimateRequest {
    pub customer_id: i64,
    #[validate(length(min = 1, message = "Home description is required"))]
    pub home_description: String,
    #[validate(range(min = 0.0, message = "Base price cannot be negative"))]
    pub base_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateEstimateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_price: Option<f64>,
    /// One of: pending, accepted, declined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
