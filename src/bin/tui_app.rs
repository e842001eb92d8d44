use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// API response types (mirror routes.rs shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TickersResponse {
    pub data: Vec<SnapshotView>,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickerResponse {
    pub data: SnapshotView,
    pub cached: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotView {
    pub address: String,
    pub record: RecordView,
    pub analysis: AnalysisView,
    pub strategy: StrategyView,
    pub boost: Option<BoostView>,
    pub updated_at_ms: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct RecordView {
    #[serde(default)]
    pub chain_id: String,
    #[serde(default)]
    pub dex_id: String,
    pub base_token: TokenView,
    #[serde(default)]
    pub price_usd: String,
    #[serde(default)]
    pub price_change: ChangeView,
    #[serde(default)]
    pub volume: VolumeView,
    pub liquidity: Option<LiquidityView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenView {
    pub name: String,
    pub symbol: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct ChangeView {
    pub h1: Option<f64>,
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct VolumeView {
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct LiquidityView {
    pub usd: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisView {
    pub score: u8,
    pub status: String,
    pub factors: FactorsView,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorsView {
    pub price_volatility: String,
    pub volume_trend: String,
    pub trend: String,
    pub abnormal_movement: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyView {
    pub buy_price: f64,
    pub sell_price: f64,
    pub spread: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostView {
    pub remaining_days: u32,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct HealthResponse {
    pub last_refresh_ok: bool,
    pub last_refresh_at_ms: u64,
    pub refresh_count: u64,
    pub last_failed_requests: u64,
    pub tokens_tracked: usize,
    pub tokens_missing: usize,
    #[serde(default)]
    pub missing_addresses: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct LatencyResponse {
    pub samples: u64,
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

#[derive(Serialize)]
struct TickerBody<'a> {
    address: &'a str,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

/// Live detail view for one token (POST /market/ticker).
#[derive(Debug, Clone, Default)]
pub struct DetailState {
    pub address: Option<String>,
    pub snapshot: Option<SnapshotView>,
    pub cached: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub tickers: Vec<SnapshotView>,
    pub missing: Vec<String>,
    pub detail: DetailState,
    pub health: HealthResponse,
    pub latency: LatencyResponse,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            tickers: Vec::new(),
            missing: Vec::new(),
            detail: DetailState::default(),
            health: HealthResponse::default(),
            latency: LatencyResponse::default(),
            base_url,
        }
    }

    pub fn showing_detail(&self) -> bool {
        self.detail.address.is_some()
    }

    /// Switch to the detail view for `address` and fetch it immediately.
    pub async fn open_detail(&mut self, client: &reqwest::Client, address: &str) {
        let snapshot = self.tickers.iter().find(|t| t.address == address).cloned();
        self.detail = DetailState {
            address: Some(address.to_string()),
            snapshot,
            cached: true,
            error: None,
        };
        self.refresh_detail(client).await;
    }

    pub fn close_detail(&mut self) {
        self.detail = DetailState::default();
    }

    /// Live lookup for the token in the detail view. On failure the last
    /// snapshot stays on screen with the error next to it.
    pub async fn refresh_detail(&mut self, client: &reqwest::Client) {
        let Some(address) = self.detail.address.clone() else {
            return;
        };
        let url = format!("{}/market/ticker", self.base_url);

        let result = client.post(&url).json(&TickerBody { address: &address }).send().await;
        match result {
            Ok(resp) if resp.status().is_success() => match resp.json::<TickerResponse>().await {
                Ok(ticker) => {
                    self.detail.snapshot = Some(ticker.data);
                    self.detail.cached = ticker.cached;
                    self.detail.error = None;
                }
                Err(e) => self.detail.error = Some(format!("parse error: {e}")),
            },
            Ok(resp) => {
                let status = resp.status();
                let message = resp
                    .json::<serde_json::Value>()
                    .await
                    .ok()
                    .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                    .unwrap_or_else(|| status.to_string());
                self.detail.error = Some(message);
            }
            Err(e) => self.detail.error = Some(format!("{e}")),
        }
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let tickers_url = format!("{}/market/tickers", self.base_url);
        let health_url = format!("{}/health", self.base_url);
        let latency_url = format!("{}/stats/latency", self.base_url);

        let (tickers_res, health_res, latency_res) = tokio::join!(
            client.get(&tickers_url).send(),
            client.get(&health_url).send(),
            client.get(&latency_url).send(),
        );

        let tickers = match tickers_res {
            Ok(resp) => resp.json::<TickersResponse>().await,
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };

        match tickers {
            Ok(t) => {
                self.tickers = t.data;
                self.missing = t.missing;
                self.status = ConnectionStatus::Connected;

                if let Ok(h) = health_res {
                    if let Ok(health) = h.json::<HealthResponse>().await {
                        self.health = health;
                    }
                }
                if let Ok(l) = latency_res {
                    if let Ok(latency) = l.json::<LatencyResponse>().await {
                        self.latency = latency;
                    }
                }
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Six decimals below $1, two otherwise.
pub fn format_price(p: f64) -> String {
    if p < 1.0 {
        format!("${p:.6}")
    } else {
        format!("${p:.2}")
    }
}

/// Price text from the feed, formatted when it parses.
pub fn format_price_text(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(p) if p.is_finite() => format_price(p),
        _ => "—".to_string(),
    }
}

pub fn format_change(pct: Option<f64>) -> String {
    match pct {
        Some(v) if v >= 0.0 => format!("+{v:.2}%"),
        Some(v) => format!("{v:.2}%"),
        None => "—".to_string(),
    }
}

/// Compact USD amount: $1.2M, $350.0K, $900.
pub fn format_usd(v: Option<f64>) -> String {
    match v {
        Some(v) if v >= 1_000_000.0 => format!("${:.1}M", v / 1_000_000.0),
        Some(v) if v >= 1_000.0 => format!("${:.1}K", v / 1_000.0),
        Some(v) => format!("${v:.0}"),
        None => "—".to_string(),
    }
}

pub fn format_boost(boost: Option<BoostView>) -> String {
    match boost {
        Some(b) => format!("{}d", b.remaining_days),
        None => "—".to_string(),
    }
}

/// Convert millisecond epoch timestamp to HH:MM:SS string (UTC).
pub fn format_time_ms(ms: i64) -> String {
    let secs = (ms / 1_000) as u64;
    let h = (secs / 3600) % 24;
    let m = (secs / 60) % 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_precision_depends_on_magnitude() {
        assert_eq!(format_price(0.0612), "$0.061200");
        assert_eq!(format_price(1.0), "$1.00");
        assert_eq!(format_price(1234.5678), "$1234.57");
        assert_eq!(format_price_text("0.5"), "$0.500000");
        assert_eq!(format_price_text("abc"), "—");
    }

    #[test]
    fn change_and_usd_formatting() {
        assert_eq!(format_change(Some(1.234)), "+1.23%");
        assert_eq!(format_change(Some(-4.5)), "-4.50%");
        assert_eq!(format_change(None), "—");
        assert_eq!(format_usd(Some(1_250_000.0)), "$1.2M");
        assert_eq!(format_usd(Some(350_000.0)), "$350.0K");
        assert_eq!(format_usd(Some(900.0)), "$900");
    }

    #[test]
    fn boost_and_time() {
        assert_eq!(format_boost(Some(BoostView { remaining_days: 12 })), "12d");
        assert_eq!(format_boost(None), "—");
        assert_eq!(format_time_ms(3_723_000), "01:02:03");
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefgh", 5), "abcd…");
        assert_eq!(truncate("ééééé", 3), "éé…");
    }

    #[test]
    fn health_and_latency_parse_camel_case() {
        let health: HealthResponse = serde_json::from_value(serde_json::json!({
            "lastRefreshOk": false,
            "lastRefreshAtMs": 1000,
            "refreshCount": 3,
            "lastFailedRequests": 2,
            "tokensTracked": 5,
            "tokensMissing": 1,
            "missingAddresses": ["0xbb"]
        }))
        .unwrap();
        assert!(!health.last_refresh_ok);
        assert_eq!(health.last_failed_requests, 2);
        assert_eq!(health.missing_addresses, vec!["0xbb".to_string()]);

        let latency: LatencyResponse = serde_json::from_value(serde_json::json!({
            "samples": 4, "p50Ms": 12.5, "p95Ms": 40.0, "p99Ms": null
        }))
        .unwrap();
        assert_eq!(latency.p50_ms, Some(12.5));
        assert_eq!(latency.p99_ms, None);
    }

    #[test]
    fn snapshot_view_parses_api_shape() {
        let body = serde_json::json!({
            "data": [{
                "address": "0xaa",
                "record": {
                    "chainId": "bsc",
                    "dexId": "pancakeswap",
                    "url": "",
                    "pairAddress": "p1",
                    "baseToken": { "address": "0xaa", "name": "Alpha", "symbol": "ALP" },
                    "quoteToken": { "symbol": "USDT" },
                    "priceUsd": "0.0612",
                    "priceChange": { "h1": 1.2, "h6": null, "h24": -4.5 },
                    "volume": { "h24": 12000.5 },
                    "liquidity": { "usd": 100000.0 },
                    "fdv": null,
                    "pairCreatedAt": null,
                    "info": null
                },
                "analysis": {
                    "score": 85,
                    "status": "STABLE",
                    "factors": {
                        "priceVolatility": "MEDIUM",
                        "volumeTrend": "NORMAL",
                        "trend": "UP",
                        "abnormalMovement": false
                    },
                    "description": "Stable basis, suitable for strategy entry."
                },
                "strategy": { "buyPrice": 0.061812, "sellPrice": 0.0610164, "spread": 0.0007956 },
                "boost": { "remainingDays": 3 },
                "updatedAtMs": 1000
            }],
            "missing": ["0xbb"]
        });
        let parsed: TickersResponse = serde_json::from_value(body).unwrap();
        let snap = &parsed.data[0];
        assert_eq!(snap.record.base_token.symbol, "ALP");
        assert_eq!(snap.analysis.score, 85);
        assert_eq!(snap.analysis.factors.trend, "UP");
        assert_eq!(snap.boost.map(|b| b.remaining_days), Some(3));
        assert_eq!(parsed.missing, vec!["0xbb".to_string()]);
    }
}
