use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Client-reported analytics event.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema, sqlx::FromRow)]
pub struct AnalyticsEvent {
    pub id: i64,
    pub dealer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Record an analytics event. Anonymous events are accepted; the server
/// fills `user_id` from the session when one is present.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema, Validate)]
pub struct TrackEventRequest {
    #[validate(length(min = 1, max = 100, message = "Event type must be 1-100 characters"))]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

/// Count of occurrences for one event type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema, sqlx::FromRow)]
pub struct EventCount {
    pub event_type: String,
    pub count: i64,
}

/// Dashboard summary for a dealership.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AnalyticsSummary {
    pub total_events: i64,
    pub events_by_type: Vec<EventCount>,
    pub active_deliveries: i64,
    pub pending_users: i64,
}

/// Date-range filter for analytics queries.
#[derive(Debug, Clone, Serialize, Deserialize, Default, utoipa::IntoParams)]
pub struct AnalyticsQueryParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
}
