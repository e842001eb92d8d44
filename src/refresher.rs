use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::interval;
use tracing::{error, info, warn};

use crate::api::health::HealthState;
use crate::db::watchlist;
use crate::engine::{normalize_address, select_best, snapshot};
use crate::feed::FeedClient;
use crate::state::TokenStore;
use crate::types::MarketRecord;

/// Counts from applying one batch of feed records to the store.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub updated: usize,
    pub missing: usize,
    pub invalid_price: usize,
    /// Watched addresses whose feed request failed.
    pub unavailable: usize,
}

/// Background task that polls the watch-list, aggregates the feed response
/// and caches one snapshot per watched address.
pub struct TickerRefresher {
    pool: sqlx::SqlitePool,
    feed: Arc<FeedClient>,
    store: Arc<TokenStore>,
    health: Arc<HealthState>,
    interval_secs: u64,
}

impl TickerRefresher {
    pub fn new(
        pool: sqlx::SqlitePool,
        feed: Arc<FeedClient>,
        store: Arc<TokenStore>,
        health: Arc<HealthState>,
        interval_secs: u64,
    ) -> Self {
        Self { pool, feed, store, health, interval_secs }
    }

    pub async fn run(self) {
        let mut ticker = interval(Duration::from_secs(self.interval_secs));

        loop {
            ticker.tick().await;
            if let Err(e) = self.refresh().await {
                self.health.record_refresh_error();
                error!("Ticker refresh failed: {e}");
            }
        }
    }

    async fn refresh(&self) -> crate::error::Result<()> {
        let watched = watchlist::addresses(&self.pool).await?;
        self.store.retain(&watched);

        if watched.is_empty() {
            self.health.record_refresh(now_ms() as u64, 0);
            info!("Ticker refresh skipped: watch-list is empty");
            return Ok(());
        }

        let (records, stats) = self.feed.fetch_pairs(&watched).await;
        let outcome = apply_batch(&self.store, &watched, records, &stats.failed_addresses, now_ms());
        self.health.record_refresh(now_ms() as u64, stats.failed_requests as u64);

        if stats.failed_requests > 0 {
            warn!(
                requests = stats.requests,
                failed_requests = stats.failed_requests,
                unavailable = outcome.unavailable,
                "Ticker refresh: feed requests failed, keeping cached snapshots for their addresses",
            );
        }
        info!(
            watched = watched.len(),
            updated = outcome.updated,
            missing = outcome.missing,
            invalid_price = outcome.invalid_price,
            unavailable = outcome.unavailable,
            pairs = stats.pairs_total,
            malformed = stats.rejected_malformed,
            "Ticker refresh complete: {} updated, {} missing",
            outcome.updated,
            outcome.missing,
        );

        Ok(())
    }
}

/// Aggregate `records`, analyze the winner for every watched address and
/// write the results into `store`.
///
/// Groups for addresses outside the watch-list (the feed also returns pairs
/// where a watched token is the quote side) are ignored. Addresses in
/// `unavailable` belong to failed feed requests: their cached snapshots are
/// left untouched. A winner with an unusable price is skipped and reported
/// missing; the rest of the batch is unaffected.
pub fn apply_batch(
    store: &TokenStore,
    watched: &[String],
    records: Vec<MarketRecord>,
    unavailable: &[String],
    now_ms: i64,
) -> RefreshOutcome {
    let unavailable: HashSet<String> = unavailable.iter().map(|a| normalize_address(a)).collect();
    let mut best = select_best(records);
    let mut outcome = RefreshOutcome::default();

    for address in watched {
        let address = normalize_address(address);
        if unavailable.contains(&address) {
            outcome.unavailable += 1;
            continue;
        }
        let Some(record) = best.remove(&address) else {
            store.mark_missing(&address);
            outcome.missing += 1;
            continue;
        };

        match snapshot(record, now_ms) {
            Ok(snap) => {
                store.upsert(snap);
                outcome.updated += 1;
            }
            Err(e) => {
                warn!(address = %address, "Skipping listing: {e}");
                store.mark_missing(&address);
                outcome.invalid_price += 1;
            }
        }
    }

    outcome
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
