use serde::{Deserialize, Serialize};

/// Default markup applied when an account has no configuration row.
pub const DEFAULT_MARKUP_PERCENTAGE: f64 = 30.0;

/// Quote request: price one or more base costs for the calling account.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuoteRequest {
    pub base_prices: Vec<f64>,
    /// Minimum profit floor in dollars; when set, the quoted price is at
    /// least base + min_profit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_profit: Option<f64>,
}

/// A single priced line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
pub struct QuoteLine {
    pub base_price: f64,
    pub final_price: f64,
}

/// Quote response with the tier the calculation used.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuoteResponse {
    pub tier: String,
    pub lines: Vec<QuoteLine>,
}
