use axum::{
    extract::{Path, State},
    Json,
};
use sqlx::{Pool, Postgres};

use homestead_types::{AppError, DeliveryStatus, TrackingLinkResponse, TrackingView};

use crate::auth::extractors::AdminRequired;
use crate::config::feature_flags;
use crate::repo;
use crate::tenant::DealerId;

#[utoipa::path(
    post,
    path = "/api/deliveries/{id}/tracking-link",
    params(
        ("id" = i64, Path, description = "Delivery ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 200, description = "Tracking link issued", body = TrackingLinkResponse),
        (status = 404, description = "Delivery not found", body = AppError)
    ),
    tag = "tracking",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool))]
pub async fn issue_tracking_link(
    State(pool): State<Pool<Postgres>>,
    _admin: AdminRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
) -> Result<Json<TrackingLinkResponse>, AppError> {
    let delivery = repo::delivery::find_by_id(&pool, &dealer.0, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Delivery {} not found", id)))?;

    let link = repo::tracking::issue(&pool, id).await?;

    // Email the link to the customer when email is on for them.
    if feature_flags().mailgun {
        let pool = pool.clone();
        let dealer_id = dealer.0.clone();
        let customer_id = delivery.customer_id;
        let home = delivery.home_description.clone();
        let token = link.token.clone();
        tokio::spawn(async move {
            if !repo::settings::email_enabled(&pool, customer_id).await {
                return;
            }
            if let Ok(Some(profile)) = repo::profile::find(&pool, &dealer_id, customer_id).await {
                crate::mailgun::send_tracking_link_email(&profile.email, &home, &token).await;
            }
        });
    }

    Ok(Json(link))
}

/// Public endpoint — no authentication, no tenant header. The token alone
/// scopes access, and the view omits customer identity and notes.
#[utoipa::path(
    get,
    path = "/api/track/{token}",
    params(("token" = String, Path, description = "Tracking token from the emailed link")),
    responses(
        (status = 200, description = "Delivery tracking view", body = TrackingView),
        (status = 404, description = "Unknown or expired link", body = AppError)
    ),
    tag = "tracking"
)]
pub async fn track_delivery(
    State(pool): State<Pool<Postgres>>,
    Path(token): Path<String>,
) -> Result<Json<TrackingView>, AppError> {
    let delivery_id = repo::tracking::resolve(&pool, &token).await?;

    let delivery = repo::delivery::find_by_id_unscoped(&pool, delivery_id)
        .await?
        .ok_or_else(|| AppError::not_found("Tracking link not found or expired"))?;

    // Expose live position only while the home is actually moving.
    let last_position = match DeliveryStatus::from_str_opt(&delivery.status) {
        Some(DeliveryStatus::InTransit) => repo::gps::last_position(&pool, delivery_id).await?,
        _ => None,
    };

    Ok(Json(TrackingView {
        status: delivery.status,
        home_description: delivery.home_description,
        destination_address: delivery.destination_address,
        scheduled_date: delivery.scheduled_date,
        last_position,
    }))
}
