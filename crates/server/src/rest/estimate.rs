use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};

use homestead_types::{
    normalize_pagination, AppError, CreateEstimateRequest, Estimate, PaginatedResponse,
    UpdateEstimateRequest, UserRole,
};

use crate::auth::extractors::{AdminRequired, AuthRequired};
use crate::config::feature_flags;
use crate::error_convert::ValidateRequest;
use crate::pricing::calculate_price;
use crate::repo;
use crate::tenant::DealerId;

/// Price an estimate for the customer it belongs to. The customer's markup
/// row (or their tier default) decides the markup chain.
async fn quote_for_customer(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    customer_id: i64,
    base_price: f64,
) -> Result<f64, AppError> {
    let ctx = repo::markup::pricing_context(pool, dealer_id, customer_id, "user").await?;
    Ok(calculate_price(base_price, &ctx, None))
}

#[utoipa::path(
    post,
    path = "/api/estimates",
    params(("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")),
    request_body = CreateEstimateRequest,
    responses(
        (status = 201, description = "Estimate created with a quoted price", body = Estimate),
        (status = 403, description = "Admin role required", body = AppError)
    ),
    tag = "estimates",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool, payload))]
pub async fn create_estimate(
    State(pool): State<Pool<Postgres>>,
    _admin: AdminRequired,
    dealer: DealerId,
    Json(payload): Json<CreateEstimateRequest>,
) -> Result<(StatusCode, Json<Estimate>), AppError> {
    payload.validate_request()?;

    let customer = repo::profile::find(&pool, &dealer.0, payload.customer_id)
        .await?
        .ok_or_else(|| {
            AppError::not_found(format!("Customer {} not found", payload.customer_id))
        })?;

    let quoted = quote_for_customer(&pool, &dealer.0, payload.customer_id, payload.base_price).await?;
    let estimate = repo::estimate::create(&pool, &dealer.0, &payload, quoted).await?;

    notify_estimate_ready(&pool, &customer.email, &estimate);

    Ok((StatusCode::CREATED, Json(estimate)))
}

/// Fire-and-forget customer notifications for a fresh quote, gated on
/// feature flags and the customer's notification settings.
fn notify_estimate_ready(pool: &Pool<Postgres>, email: &str, estimate: &Estimate) {
    let flags = feature_flags();
    if !flags.mailgun && !flags.twilio {
        return;
    }

    let pool = pool.clone();
    let email = email.to_string();
    let customer_id = estimate.customer_id;
    let home = estimate.home_description.clone();
    let quoted = estimate.quoted_price;
    tokio::spawn(async move {
        if flags.mailgun && repo::settings::email_enabled(&pool, customer_id).await {
            crate::mailgun::send_estimate_email(&email, &home, quoted).await;
        }
        if flags.twilio {
            let message = format!("Your estimate for {} is ready: ${:.2}", home, quoted);
            crate::twilio::send_delivery_alert(&pool, customer_id, &message).await;
        }
    });
}

#[derive(Debug, Clone, Default, serde::Deserialize, utoipa::IntoParams)]
pub struct EstimateListParams {
    pub customer_id: Option<i64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/estimates",
    params(
        EstimateListParams,
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 200, description = "Estimates visible to the caller", body = PaginatedResponse<Estimate>)
    ),
    tag = "estimates",
    security(("bearer_auth" = []))
)]
pub async fn list_estimates(
    State(pool): State<Pool<Postgres>>,
    auth: AuthRequired,
    dealer: DealerId,
    Query(mut params): Query<EstimateListParams>,
) -> Result<Json<PaginatedResponse<Estimate>>, AppError> {
    // Customers only see their own estimates regardless of the filter.
    if !UserRole::from_str_or_default(&auth.0.role).satisfies(&UserRole::Admin) {
        params.customer_id = Some(auth.0.sub);
    }

    let (page, limit) = normalize_pagination(params.page, params.limit);
    let estimates = repo::estimate::list(&pool, &dealer.0, params.customer_id, page, limit).await?;
    Ok(Json(estimates))
}

#[utoipa::path(
    get,
    path = "/api/estimates/{id}",
    params(
        ("id" = i64, Path, description = "Estimate ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 200, description = "Estimate detail", body = Estimate),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "estimates",
    security(("bearer_auth" = []))
)]
pub async fn get_estimate(
    State(pool): State<Pool<Postgres>>,
    auth: AuthRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
) -> Result<Json<Estimate>, AppError> {
    let estimate = repo::estimate::find_by_id(&pool, &dealer.0, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Estimate {} not found", id)))?;

    let is_staff = UserRole::from_str_or_default(&auth.0.role).satisfies(&UserRole::Admin);
    if !is_staff && estimate.customer_id != auth.0.sub {
        return Err(AppError::not_found(format!("Estimate {} not found", id)));
    }

    Ok(Json(estimate))
}

#[utoipa::path(
    put,
    path = "/api/estimates/{id}",
    params(
        ("id" = i64, Path, description = "Estimate ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    request_body = UpdateEstimateRequest,
    responses(
        (status = 200, description = "Estimate updated; quote recomputed when the base price changed", body = Estimate),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "estimates",
    security(("bearer_auth" = []))
)]
pub async fn update_estimate(
    State(pool): State<Pool<Postgres>>,
    _admin: AdminRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateEstimateRequest>,
) -> Result<Json<Estimate>, AppError> {
    if let Some(status) = payload.status.as_deref() {
        if !matches!(status, "pending" | "accepted" | "declined") {
            return Err(AppError::bad_request(format!(
                "Invalid estimate status: {}",
                status
            )));
        }
    }

    let existing = repo::estimate::find_by_id(&pool, &dealer.0, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Estimate {} not found", id)))?;

    let quoted = match payload.base_price {
        Some(base) => {
            Some(quote_for_customer(&pool, &dealer.0, existing.customer_id, base).await?)
        }
        None => None,
    };

    let estimate = repo::estimate::update(&pool, &dealer.0, id, &payload, quoted)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Estimate {} not found", id)))?;
    Ok(Json(estimate))
}

#[utoipa::path(
    delete,
    path = "/api/estimates/{id}",
    params(
        ("id" = i64, Path, description = "Estimate ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 204, description = "Estimate deleted"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "estimates",
    security(("bearer_auth" = []))
)]
pub async fn delete_estimate(
    State(pool): State<Pool<Postgres>>,
    _admin: AdminRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let deleted = repo::estimate::delete(&pool, &dealer.0, id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!("Estimate {} not found", id)))
    }
}
