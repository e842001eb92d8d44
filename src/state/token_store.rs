use std::collections::HashSet;
use std::sync::Arc;

use dashmap::{DashMap, DashSet};

use crate::engine::normalize_address;
use crate::types::TokenSnapshot;

/// Latest snapshot per watched address, shared between the refresher and the
/// API. Addresses are stored normalized.
pub struct TokenStore {
    /// address → last computed snapshot
    snapshots: DashMap<String, TokenSnapshot>,
    /// watched addresses the feed returned nothing for on the last refresh
    missing: DashSet<String>,
    /// addresses with a live upstream lookup in flight
    in_flight: DashSet<String>,
}

impl TokenStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            snapshots: DashMap::new(),
            missing: DashSet::new(),
            in_flight: DashSet::new(),
        })
    }

    pub fn upsert(&self, snapshot: TokenSnapshot) {
        self.missing.remove(&snapshot.address);
        self.snapshots.insert(snapshot.address.clone(), snapshot);
    }

    pub fn get(&self, address: &str) -> Option<TokenSnapshot> {
        self.snapshots
            .get(&normalize_address(address))
            .map(|s| s.value().clone())
    }

    /// Record that the feed had no usable listing for `address`. Any stale
    /// snapshot is dropped so it is not served as current.
    pub fn mark_missing(&self, address: &str) {
        let address = normalize_address(address);
        self.snapshots.remove(&address);
        self.missing.insert(address);
    }

    /// Missing addresses, sorted.
    pub fn missing(&self) -> Vec<String> {
        let mut out: Vec<String> = self.missing.iter().map(|a| a.key().clone()).collect();
        out.sort();
        out
    }

    /// Drop everything not in `watched`.
    pub fn retain(&self, watched: &[String]) {
        let watched: HashSet<String> = watched.iter().map(|a| normalize_address(a)).collect();
        self.snapshots.retain(|address, _| watched.contains(address));
        self.missing.retain(|address| watched.contains(address));
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }

    /// Claim the live-lookup slot for `address`. Returns None if another
    /// lookup for the same address is already running. The slot is released
    /// when the guard drops, including when the request future is cancelled.
    pub fn begin_fetch(self: &Arc<Self>, address: &str) -> Option<FetchGuard> {
        let address = normalize_address(address);
        if !self.in_flight.insert(address.clone()) {
            return None;
        }
        Some(FetchGuard { store: Arc::clone(self), address })
    }
}

pub struct FetchGuard {
    store: Arc<TokenStore>,
    address: String,
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        self.store.in_flight.remove(&self.address);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::snapshot;
    use crate::types::MarketRecord;

    fn snap(address: &str, price: &str) -> TokenSnapshot {
        let record: MarketRecord = serde_json::from_value(serde_json::json!({
            "baseToken": { "address": address, "name": "T", "symbol": "T" },
            "priceUsd": price,
            "liquidity": { "usd": 250000.0 },
            "volume": { "h24": 40000.0 }
        }))
        .unwrap();
        snapshot(record, 0).unwrap()
    }

    #[test]
    fn upsert_replaces_and_lookup_is_case_insensitive() {
        let store = TokenStore::new();
        store.upsert(snap("0xAA", "1.0"));
        store.upsert(snap("0xaa", "2.0"));
        assert_eq!(store.snapshot_count(), 1);
        assert_eq!(store.get("0XAA").unwrap().record.price_usd, "2.0");
    }

    #[test]
    fn missing_clears_snapshot_and_upsert_clears_missing() {
        let store = TokenStore::new();
        store.upsert(snap("0xaa", "1.0"));
        store.mark_missing("0xAA");
        assert!(store.get("0xaa").is_none());
        assert_eq!(store.missing(), vec!["0xaa".to_string()]);

        store.upsert(snap("0xaa", "1.0"));
        assert_eq!(store.missing_count(), 0);
    }

    #[test]
    fn retain_drops_unwatched_addresses() {
        let store = TokenStore::new();
        store.upsert(snap("0xbb", "1.0"));
        store.upsert(snap("0xaa", "1.0"));
        store.mark_missing("0xcc");
        store.retain(&["0xAA".to_string()]);

        assert_eq!(store.snapshot_count(), 1);
        assert!(store.get("0xaa").is_some());
        assert!(store.get("0xbb").is_none());
        assert!(store.missing().is_empty());
    }

    #[test]
    fn only_one_live_fetch_per_address() {
        let store = TokenStore::new();
        let guard = store.begin_fetch("0xAA").expect("first claim");
        assert!(store.begin_fetch("0xaa").is_none());
        assert!(store.begin_fetch("0xbb").is_some());
        drop(guard);
        assert!(store.begin_fetch("0xaa").is_some());
    }
}
