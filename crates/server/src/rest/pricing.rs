use axum::{extract::State, Json};
use sqlx::{Pool, Postgres};

use homestead_types::{AppError, QuoteLine, QuoteRequest, QuoteResponse};

use crate::auth::extractors::AuthRequired;
use crate::repo;
use crate::tenant::DealerId;

#[utoipa::path(
    post,
    path = "/api/pricing/quote",
    params(("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")),
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Quoted prices for the calling account", body = QuoteResponse),
        (status = 401, description = "Not authenticated", body = AppError)
    ),
    tag = "pricing",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool, auth, payload))]
pub async fn quote(
    State(pool): State<Pool<Postgres>>,
    auth: AuthRequired,
    dealer: DealerId,
    Json(payload): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, AppError> {
    if payload.base_prices.is_empty() {
        return Err(AppError::bad_request("base_prices cannot be empty"));
    }
    if payload.base_prices.len() > 100 {
        return Err(AppError::bad_request("At most 100 prices per quote"));
    }

    let ctx = repo::markup::pricing_context(&pool, &dealer.0, auth.0.sub, &auth.0.tier).await?;

    let lines = payload
        .base_prices
        .iter()
        .map(|&base_price| QuoteLine {
            base_price,
            final_price: crate::pricing::calculate_price_cached(
                auth.0.sub,
                base_price,
                &ctx,
                payload.min_profit,
            ),
        })
        .collect();

    Ok(Json(QuoteResponse {
        tier: ctx.tier.as_str().to_string(),
        lines,
    }))
}
