use crate::config::strategy_offsets::{BUY_MULTIPLIER, SELL_MULTIPLIER};
use crate::types::CalculatedStrategy;

/// Entry/exit band around the current price: buy-stop 1% above, take-profit
/// 0.3% below. Non-positive or non-finite prices yield an all-zero band.
pub fn strategy(current_price: f64) -> CalculatedStrategy {
    if !current_price.is_finite() || current_price <= 0.0 {
        return CalculatedStrategy::default();
    }

    let buy_price = current_price * BUY_MULTIPLIER;
    let sell_price = current_price * SELL_MULTIPLIER;

    CalculatedStrategy {
        buy_price,
        sell_price,
        spread: buy_price - sell_price,
    }
}
