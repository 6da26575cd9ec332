use homestead_types::{PricingTier, DEFAULT_MARKUP_PERCENTAGE};
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

/// Memoized final prices keyed by (user, base price in cents, min profit
/// in cents). Invalidated whenever the user's markup row changes.
static PRICE_CACHE: LazyLock<Mutex<HashMap<(i64, i64, i64), f64>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Round to cents. All price math happens in f64 dollars; rounding once
/// at the end keeps layered percentages exact enough for display.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Markup inputs for one account, resolved from its markup row.
#[derive(Debug, Clone, Copy)]
pub struct MarkupContext {
    pub tier: PricingTier,
    /// The account's own markup percentage.
    pub own_markup: f64,
    /// The parent reseller's markup percentage, when the account sits
    /// under one in the hierarchy.
    pub parent_markup: Option<f64>,
}

impl MarkupContext {
    /// Context for an account with no markup row: base tier, default markup,
    /// parent at the default as well.
    pub fn default_for(tier: PricingTier) -> Self {
        Self {
            tier,
            own_markup: DEFAULT_MARKUP_PERCENTAGE,
            parent_markup: match tier {
                PricingTier::SuperAdmin => None,
                _ => Some(DEFAULT_MARKUP_PERCENTAGE),
            },
        }
    }
}

/// Compute the final price for a base cost under tiered markup.
///
/// Super admins sit at the top of the hierarchy and apply only their own
/// markup. Admins and users buy through a parent, so the parent's markup
/// applies first and their own compounds on top. A zero base always
/// prices to zero regardless of markup or profit floor.
///
/// When `min_profit` is set, the result is at least `base + min_profit` —
/// a floor for homes where percentage markup alone would underprice.
pub fn calculate_price(
    base_price: f64,
    ctx: &MarkupContext,
    min_profit: Option<f64>,
) -> f64 {
    if base_price <= 0.0 {
        return 0.0;
    }

    let own = 1.0 + ctx.own_markup / 100.0;
    let tiered = match ctx.tier {
        PricingTier::SuperAdmin => base_price * own,
        PricingTier::Admin | PricingTier::User => {
            let parent = 1.0 + ctx.parent_markup.unwrap_or(DEFAULT_MARKUP_PERCENTAGE) / 100.0;
            base_price * parent * own
        }
    };

    let floored = match min_profit {
        Some(profit) if profit > 0.0 => tiered.max(base_price + profit),
        _ => tiered,
    };

    round_cents(floored)
}

/// Memoizing wrapper around [`calculate_price`], keyed per user.
pub fn calculate_price_cached(
    user_id: i64,
    base_price: f64,
    ctx: &MarkupContext,
    min_profit: Option<f64>,
) -> f64 {
    let key = (
        user_id,
        (base_price * 100.0).round() as i64,
        (min_profit.unwrap_or(0.0) * 100.0).round() as i64,
    );

    if let Some(cached) = PRICE_CACHE.lock().unwrap().get(&key) {
        return *cached;
    }

    let price = calculate_price(base_price, ctx, min_profit);
    PRICE_CACHE.lock().unwrap().insert(key, price);
    price
}

/// Drop every memoized price for a user. Called when their markup changes.
pub fn invalidate_user_prices(user_id: i64) {
    PRICE_CACHE
        .lock()
        .unwrap()
        .retain(|(uid, _, _), _| *uid != user_id);
}
