use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};

use homestead_types::{
    normalize_pagination, AppError, CreateDeliveryRequest, Delivery, DeliverySearchParams,
    DeliveryStatus, PaginatedResponse, UpdateDeliveryRequest, UpdateDeliveryStatusRequest,
    UserRole,
};

use crate::auth::extractors::{AdminRequired, AuthRequired};
use crate::config::feature_flags;
use crate::error_convert::ValidateRequest;
use crate::repo;
use crate::tenant::DealerId;

#[utoipa::path(
    post,
    path = "/api/deliveries",
    params(("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")),
    request_body = CreateDeliveryRequest,
    responses(
        (status = 201, description = "Delivery created", body = Delivery),
        (status = 403, description = "Admin role required", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "deliveries",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool, payload))]
pub async fn create_delivery(
    State(pool): State<Pool<Postgres>>,
    _admin: AdminRequired,
    dealer: DealerId,
    Json(payload): Json<CreateDeliveryRequest>,
) -> Result<(StatusCode, Json<Delivery>), AppError> {
    payload.validate_request()?;
    let delivery = repo::delivery::create(&pool, &dealer.0, payload).await?;
    Ok((StatusCode::CREATED, Json(delivery)))
}

#[utoipa::path(
    get,
    path = "/api/deliveries",
    params(
        DeliverySearchParams,
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 200, description = "Deliveries", body = PaginatedResponse<Delivery>)
    ),
    tag = "deliveries",
    security(("bearer_auth" = []))
)]
pub async fn list_deliveries(
    State(pool): State<Pool<Postgres>>,
    auth: AuthRequired,
    dealer: DealerId,
    Query(mut params): Query<DeliverySearchParams>,
) -> Result<Json<PaginatedResponse<Delivery>>, AppError> {
    // Customers see their own deliveries; drivers theirs.
    match UserRole::from_str_or_default(&auth.0.role) {
        UserRole::Customer => params.customer_id = Some(auth.0.sub),
        UserRole::Driver => params.driver_id = Some(auth.0.sub),
        _ => {}
    }

    let (page, limit) = normalize_pagination(params.page, params.limit);
    let deliveries = repo::delivery::search(&pool, &dealer.0, &params, page, limit).await?;
    Ok(Json(deliveries))
}

#[utoipa::path(
    get,
    path = "/api/deliveries/{id}",
    params(
        ("id" = i64, Path, description = "Delivery ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 200, description = "Delivery", body = Delivery),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "deliveries",
    security(("bearer_auth" = []))
)]
pub async fn get_delivery(
    State(pool): State<Pool<Postgres>>,
    auth: AuthRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
) -> Result<Json<Delivery>, AppError> {
    let delivery = repo::delivery::find_by_id(&pool, &dealer.0, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Delivery {} not found", id)))?;

    // Customers can only read their own delivery.
    let role = UserRole::from_str_or_default(&auth.0.role);
    if role == UserRole::Customer && delivery.customer_id != auth.0.sub {
        return Err(AppError::not_found(format!("Delivery {} not found", id)));
    }

    Ok(Json(delivery))
}

#[utoipa::path(
    put,
    path = "/api/deliveries/{id}",
    params(
        ("id" = i64, Path, description = "Delivery ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    request_body = UpdateDeliveryRequest,
    responses(
        (status = 200, description = "Delivery updated", body = Delivery),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "deliveries",
    security(("bearer_auth" = []))
)]
pub async fn update_delivery(
    State(pool): State<Pool<Postgres>>,
    _admin: AdminRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateDeliveryRequest>,
) -> Result<Json<Delivery>, AppError> {
    let delivery = repo::delivery::update(&pool, &dealer.0, id, payload)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Delivery {} not found", id)))?;
    Ok(Json(delivery))
}

#[utoipa::path(
    patch,
    path = "/api/deliveries/{id}/status",
    params(
        ("id" = i64, Path, description = "Delivery ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    request_body = UpdateDeliveryStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = Delivery),
        (status = 400, description = "Transition not allowed", body = AppError),
        (status = 404, description = "Not found", body = AppError),
        (status = 409, description = "Concurrent status change", body = AppError)
    ),
    tag = "deliveries",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool))]
pub async fn update_delivery_status(
    State(pool): State<Pool<Postgres>>,
    auth: AuthRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateDeliveryStatusRequest>,
) -> Result<Json<Delivery>, AppError> {
    // Admins move deliveries freely; the assigned driver may advance the
    // delivery they are hauling.
    let role = UserRole::from_str_or_default(&auth.0.role);
    if !role.satisfies(&UserRole::Admin) {
        let is_assigned = role == UserRole::Driver
            && repo::assignment::is_assigned_driver(&pool, id, auth.0.sub).await?;
        if !is_assigned {
            return Err(AppError::forbidden(
                "Only admins or the assigned driver can change delivery status",
            ));
        }
        // Drivers cannot cancel.
        if payload.status == DeliveryStatus::Cancelled {
            return Err(AppError::forbidden("Only admins can cancel a delivery"));
        }
    }

    let delivery = repo::delivery::transition_status(&pool, &dealer.0, id, payload.status).await?;

    notify_status_change(&pool, &delivery);

    Ok(Json(delivery))
}

/// Fire-and-forget customer notifications for a status change, gated on
/// feature flags and the customer's notification settings.
fn notify_status_change(pool: &Pool<Postgres>, delivery: &Delivery) {
    let flags = feature_flags();
    if !flags.mailgun && !flags.twilio {
        return;
    }

    let pool = pool.clone();
    let dealer_id = delivery.dealer_id.clone();
    let customer_id = delivery.customer_id;
    let home = delivery.home_description.clone();
    let status = delivery.status.clone();
    tokio::spawn(async move {
        if flags.mailgun && repo::settings::email_enabled(&pool, customer_id).await {
            if let Ok(Some(profile)) = repo::profile::find(&pool, &dealer_id, customer_id).await {
                crate::mailgun::send_delivery_status_email(&profile.email, &home, &status).await;
            }
        }
        if flags.twilio {
            let message = format!("Your home delivery is now {}", status.replace('_', " "));
            crate::twilio::send_delivery_alert(&pool, customer_id, &message).await;
        }
    });
}

#[utoipa::path(
    delete,
    path = "/api/deliveries/{id}",
    params(
        ("id" = i64, Path, description = "Delivery ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 204, description = "Delivery deleted"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "deliveries",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool))]
pub async fn delete_delivery(
    State(pool): State<Pool<Postgres>>,
    _admin: AdminRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    repo::tracking::revoke_for_delivery(&pool, id).await?;
    let deleted = repo::delivery::delete(&pool, &dealer.0, id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!("Delivery {} not found", id)))
    }
}
