use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::api::latency::LatencyStats;
use crate::config::{Config, FEED_MAX_ADDRESSES_PER_REQUEST, FEED_TIMEOUT_SECS};
use crate::engine::{normalize_address, select_one};
use crate::error::Result;
use crate::types::MarketRecord;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FeedStats {
    pub requests: usize,
    pub failed_requests: usize,
    pub pairs_total: usize,
    pub rejected_malformed: usize,
    /// Addresses whose request failed. No conclusion can be drawn about them.
    pub failed_addresses: Vec<String>,
}

impl FeedStats {
    fn merge(&mut self, other: FeedStats) {
        self.requests += other.requests;
        self.failed_requests += other.failed_requests;
        self.pairs_total += other.pairs_total;
        self.rejected_malformed += other.rejected_malformed;
        self.failed_addresses.extend(other.failed_addresses);
    }
}

/// Client for the DexScreener token endpoint:
/// `GET {base}/{addr1,addr2,...}` → `{ "pairs": [ ... ] | null }`.
pub struct FeedClient {
    client: reqwest::Client,
    base_url: String,
    latency: Arc<LatencyStats>,
}

impl FeedClient {
    pub fn new(cfg: &Config, latency: Arc<LatencyStats>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(FEED_TIMEOUT_SECS));
        if let Some(proxy_url) = &cfg.proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: cfg.feed_api_url.clone(),
            latency,
        })
    }

    /// Fetch every pair listed for `addresses`.
    ///
    /// Addresses are de-duplicated case-insensitively (first occurrence wins)
    /// and split into requests of at most 30. A failed request or a malformed
    /// pair is counted in the returned stats and skipped; the rest of the batch
    /// still comes back, in request order. The addresses of failed requests
    /// are listed in `FeedStats::failed_addresses`.
    pub async fn fetch_pairs(&self, addresses: &[String]) -> (Vec<MarketRecord>, FeedStats) {
        let unique = unique_addresses(addresses);
        let chunks: Vec<&[String]> = unique.chunks(FEED_MAX_ADDRESSES_PER_REQUEST).collect();

        let results = join_all(chunks.iter().map(|chunk| self.fetch_chunk(chunk))).await;

        let mut records = Vec::new();
        let mut stats = FeedStats::default();
        for (chunk, result) in chunks.iter().zip(results) {
            stats.requests += 1;
            match result {
                Ok((pairs, chunk_stats)) => {
                    records.extend(pairs);
                    stats.merge(chunk_stats);
                }
                Err(e) => {
                    stats.failed_requests += 1;
                    stats.failed_addresses.extend(chunk.iter().cloned());
                    warn!(addresses = chunk.len(), "[FEED] request failed: {e}");
                }
            }
        }

        (records, stats)
    }

    /// Fetch the authoritative listing for one address.
    pub async fn fetch_token(&self, address: &str) -> Result<MarketRecord> {
        let address = normalize_address(address);
        let (pairs, stats) = self.fetch_chunk(std::slice::from_ref(&address)).await?;
        debug!(
            address = %address,
            pairs = stats.pairs_total,
            rejected = stats.rejected_malformed,
            "[FEED] single lookup",
        );
        select_one(&address, pairs)
    }

    async fn fetch_chunk(&self, addresses: &[String]) -> Result<(Vec<MarketRecord>, FeedStats)> {
        let url = format!("{}/{}", self.base_url, addresses.join(","));

        let started = Instant::now();
        let resp = self.client.get(&url).send().await;
        self.latency.record(started.elapsed());

        let body: serde_json::Value = resp?.error_for_status()?.json().await?;
        Ok(parse_pairs(&body))
    }
}

/// Parse a token-endpoint response body. `pairs` may be missing or null when
/// none of the requested addresses has a listing.
pub fn parse_pairs(body: &serde_json::Value) -> (Vec<MarketRecord>, FeedStats) {
    let mut stats = FeedStats::default();
    let Some(items) = body.get("pairs").and_then(|p| p.as_array()) else {
        return (Vec::new(), stats);
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        stats.pairs_total += 1;
        match serde_json::from_value::<MarketRecord>(item.clone()) {
            Ok(record) => records.push(record),
            Err(e) => {
                stats.rejected_malformed += 1;
                let pair = item.get("pairAddress").and_then(|p| p.as_str()).unwrap_or("?");
                warn!(pair = %pair, "[FEED] skipping malformed pair: {e}");
            }
        }
    }

    (records, stats)
}

fn unique_addresses(addresses: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    addresses
        .iter()
        .map(|a| normalize_address(a))
        .filter(|a| !a.is_empty() && seen.insert(a.clone()))
        .collect()
}
