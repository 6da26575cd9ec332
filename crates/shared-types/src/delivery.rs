use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Lifecycle state of a delivery.
///
/// Transitions are guarded: a delivery moves forward through
/// scheduled → in_transit → delivered → completed, and may be cancelled
/// from any non-terminal state. Anything else is rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Scheduled,
    InTransit,
    Delivered,
    Completed,
    Cancelled,
}

impl DeliveryStatus {
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(DeliveryStatus::Scheduled),
            "in_transit" => Some(DeliveryStatus::InTransit),
            "delivered" => Some(DeliveryStatus::Delivered),
            "completed" => Some(DeliveryStatus::Completed),
            "cancelled" => Some(DeliveryStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Scheduled => "scheduled",
            DeliveryStatus::InTransit => "in_transit",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Completed => "completed",
            DeliveryStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Completed | DeliveryStatus::Cancelled)
    }

    /// Whether a transition from `self` to `next` is allowed.
    pub fn can_transition(&self, next: DeliveryStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == DeliveryStatus::Cancelled {
            return true;
        }
        matches!(
            (self, next),
            (DeliveryStatus::Scheduled, DeliveryStatus::InTransit)
                | (DeliveryStatus::InTransit, DeliveryStatus::Delivered)
                | (DeliveryStatus::Delivered, DeliveryStatus::Completed)
        )
    }
}

/// Delivery record for a sold home.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema, sqlx::FromRow)]
pub struct Delivery {
    pub id: i64,
    pub dealer_id: String,
    /// Customer the home is being delivered to.
    pub customer_id: i64,
    pub status: String,
    /// Human-readable description of the home being delivered.
    pub home_description: String,
    pub destination_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Driver assignment for a delivery. A delivery may have at most one
/// active assignment at a time.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema, sqlx::FromRow)]
pub struct DeliveryAssignment {
    pub id: i64,
    pub delivery_id: i64,
    pub driver_id: i64,
    pub assigned_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unassigned_at: Option<DateTime<Utc>>,
}

/// Photo attached to a delivery (site prep, setup, completion).
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema, sqlx::FromRow)]
pub struct DeliveryPhoto {
    pub id: i64,
    pub delivery_id: i64,
    pub uploaded_by: i64,
    /// Object key in the photo bucket; the URL is derived per-request.
    pub object_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A single GPS sample from a driver device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema, sqlx::FromRow)]
pub struct GpsPing {
    pub id: i64,
    pub delivery_id: i64,
    pub driver_id: i64,
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_mph: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    /// When the sample was taken on-device (may lag ingestion when the
    /// driver was offline and the sample was queued).
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// GPS sample as submitted by a driver device. Batches are accepted so
/// offline-queued samples can be flushed in one request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema, Validate)]
pub struct GpsPingRequest {
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude out of range"))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude out of range"))]
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_mph: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

/// Batch GPS submission.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GpsBatchRequest {
    pub pings: Vec<GpsPingRequest>,
}

/// Response to a GPS batch submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
pub struct GpsBatchResponse {
    /// Samples accepted into the buffer.
    pub accepted: usize,
    /// Samples rejected for invalid coordinates.
    pub rejected: usize,
}

/// Create a new delivery.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema, Validate)]
pub struct CreateDeliveryRequest {
    pub customer_id: i64,
    #[validate(length(min = 1, message = "Home description is required"))]
    pub home_description: String,
    #[validate(length(min = 1, message = "Destination address is required"))]
    pub destination_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Partial update of delivery fields (not status; see status endpoint).
#[derive(Debug, Clone, Serialize, Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateDeliveryRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Request a guarded status transition.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UpdateDeliveryStatusRequest {
    pub status: DeliveryStatus,
}

/// Assign a driver to a delivery.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AssignDriverRequest {
    pub driver_id: i64,
}

/// Attach a photo already uploaded to the photo bucket.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema, Validate)]
pub struct AttachPhotoRequest {
    #[validate(length(min = 1, message = "Object key is required"))]
    pub object_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Delivery list filters.
#[derive(Debug, Clone, Serialize, Deserialize, Default, utoipa::IntoParams)]
pub struct DeliverySearchParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

/// Unauthenticated view of a delivery, exposed via tracking token.
/// Deliberately omits customer identity and internal notes.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TrackingView {
    pub status: String,
    pub home_description: String,
    pub destination_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDate>,
    /// Most recent driver position, if the delivery is in transit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_position: Option<TrackingPosition>,
}

/// Latest position snippet for the public tracking page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
pub struct TrackingPosition {
    pub lat: f64,
    pub lng: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Tracking token row. The token itself is stored hashed.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema, sqlx::FromRow)]
pub struct TrackingToken {
    pub id: i64,
    pub delivery_id: i64,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Response when a tracking link is issued. The plaintext token appears
/// only here and is never stored.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TrackingLinkResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
