//! Aggregation and scoring engine. Pure functions over already-parsed feed
//! records: no I/O, no shared state, no logging.

pub mod aggregator;
pub mod boost;
pub mod stability;
pub mod strategy;

pub use aggregator::{normalize_address, select_best, select_one};
pub use boost::boost_window;
pub use stability::{analyze, parse_price};
pub use strategy::strategy;

use crate::error::Result;
use crate::types::{MarketRecord, TokenSnapshot};

/// Run the full analysis for one authoritative record.
pub fn snapshot(record: MarketRecord, now_ms: i64) -> Result<TokenSnapshot> {
    let analysis = analyze(&record)?;
    let current_price = parse_price(&record.price_usd)?;

    Ok(TokenSnapshot {
        address: normalize_address(&record.base_token.address),
        strategy: strategy(current_price),
        boost: boost_window(record.pair_created_at, now_ms),
        analysis,
        record,
        updated_at_ms: now_ms,
    })
}
