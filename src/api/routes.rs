use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::db::{models::TokenRow, watchlist};
use crate::engine::{normalize_address, snapshot};
use crate::error::AppError;
use crate::feed::FeedClient;
use crate::state::TokenStore;
use crate::types::TokenSnapshot;

#[derive(Clone)]
pub struct ApiState {
    pub pool: sqlx::SqlitePool,
    pub store: Arc<TokenStore>,
    pub feed: Arc<FeedClient>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/tokens", get(get_tokens).post(post_token))
        .route("/market/tickers", get(get_tickers))
        .route("/market/ticker", post(post_ticker))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTokenBody {
    pub address: Option<String>,
    pub chain_id: Option<String>,
}

#[derive(Deserialize)]
pub struct TickerBody {
    pub address: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TokensResponse {
    pub tokens: Vec<TokenRow>,
}

#[derive(Serialize)]
pub struct AddTokenResponse {
    pub ok: bool,
    pub added: bool,
}

#[derive(Serialize)]
pub struct TickersResponse {
    pub data: Vec<TokenSnapshot>,
    /// Watched addresses with no current listing.
    pub missing: Vec<String>,
}

#[derive(Serialize)]
pub struct TickerResponse {
    pub data: TokenSnapshot,
    /// True when served from cache because a live lookup was already running.
    pub cached: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub last_refresh_ok: bool,
    pub last_refresh_at_ms: u64,
    pub refresh_count: u64,
    pub last_failed_requests: u64,
    pub tokens_tracked: usize,
    pub tokens_missing: usize,
    /// Watched addresses the last refresh found no usable listing for.
    pub missing_addresses: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyResponse {
    pub samples: u64,
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_tokens(State(state): State<ApiState>) -> Result<Json<TokensResponse>, AppError> {
    let tokens = watchlist::list(&state.pool).await?;
    Ok(Json(TokensResponse { tokens }))
}

async fn post_token(
    State(state): State<ApiState>,
    Json(body): Json<AddTokenBody>,
) -> Result<(StatusCode, Json<AddTokenResponse>), AppError> {
    let address = required_address(body.address.as_deref())?;
    let chain_id = body.chain_id.as_deref().map(str::trim).filter(|c| !c.is_empty());

    let added = watchlist::insert(&state.pool, &address, chain_id).await?;
    info!(address = %address, added, "Watch-list insert");
    Ok((StatusCode::CREATED, Json(AddTokenResponse { ok: true, added })))
}

/// Cached snapshots for the watch-list, newest watched first.
async fn get_tickers(State(state): State<ApiState>) -> Result<Json<TickersResponse>, AppError> {
    let watched = watchlist::addresses(&state.pool).await?;

    let mut data = Vec::with_capacity(watched.len());
    let mut missing = Vec::new();
    for address in watched {
        match state.store.get(&address) {
            Some(snap) => data.push(snap),
            None => missing.push(address),
        }
    }

    Ok(Json(TickersResponse { data, missing }))
}

/// Live lookup for one address. At most one upstream fetch per address runs at
/// a time; a concurrent request gets the cached snapshot instead.
async fn post_ticker(
    State(state): State<ApiState>,
    Json(body): Json<TickerBody>,
) -> Result<Json<TickerResponse>, AppError> {
    let address = required_address(body.address.as_deref())?;

    let Some(_guard) = state.store.begin_fetch(&address) else {
        debug!(address = %address, "Live lookup already in flight, serving cache");
        return match state.store.get(&address) {
            Some(data) => Ok(Json(TickerResponse { data, cached: true })),
            None => Err(AppError::FetchInProgress(address)),
        };
    };

    let record = state.feed.fetch_token(&address).await?;
    let data = snapshot(record, now_ms())?;
    state.store.upsert(data.clone());

    Ok(Json(TickerResponse { data, cached: false }))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        last_refresh_ok: state.health.last_refresh_ok(),
        last_refresh_at_ms: state.health.last_refresh_at_ms(),
        refresh_count: state.health.refresh_count(),
        last_failed_requests: state.health.last_failed_requests(),
        tokens_tracked: state.store.snapshot_count(),
        tokens_missing: state.store.missing_count(),
        missing_addresses: state.store.missing(),
    })
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let to_ms = |us: Option<u64>| us.map(|v| v as f64 / 1_000.0);
    let (p50, p95, p99) = state.latency.percentiles();
    Json(LatencyResponse {
        samples: state.latency.len(),
        p50_ms: to_ms(p50),
        p95_ms: to_ms(p95),
        p99_ms: to_ms(p99),
    })
}

fn required_address(raw: Option<&str>) -> Result<String, AppError> {
    let address = normalize_address(raw.unwrap_or_default());
    if address.is_empty() {
        return Err(AppError::BadRequest("address is required".to_string()));
    }
    Ok(address)
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::watchlist::tests::memory_pool;
    use axum::extract::Path;

    /// Fake feed: every address gets one listing, except `0xnone` (no pairs)
    /// and `0xbad` (unparsable price).
    async fn serve_fake_feed() -> String {
        async fn tokens(Path(list): Path<String>) -> Json<serde_json::Value> {
            let pairs: Vec<serde_json::Value> = list
                .split(',')
                .filter(|a| *a != "0xnone")
                .map(|a| {
                    let price = if a == "0xbad" { "?" } else { "2.00" };
                    serde_json::json!({
                        "chainId": "bsc",
                        "pairAddress": format!("{a}-pair"),
                        "baseToken": { "address": a, "name": "Alpha", "symbol": "ALP" },
                        "quoteToken": { "symbol": "USDT" },
                        "priceUsd": price,
                        "priceChange": { "h1": 0.0, "h24": 1.5 },
                        "volume": { "h24": 50000.0 },
                        "liquidity": { "usd": 1000000.0 }
                    })
                })
                .collect();
            Json(serde_json::json!({ "pairs": pairs }))
        }

        let app = Router::new().route("/tokens/:list", get(tokens));
        spawn(app).await
    }

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    async fn serve_api() -> (String, ApiState) {
        let feed_url = format!("{}/tokens", serve_fake_feed().await);
        let cfg = Config {
            feed_api_url: feed_url,
            proxy_url: None,
            log_level: "info".to_string(),
            db_path: ":memory:".to_string(),
            api_port: 0,
            refresh_interval_secs: 15,
            seed_addresses: Vec::new(),
        };
        let latency = Arc::new(LatencyStats::new());
        let state = ApiState {
            pool: memory_pool().await,
            store: TokenStore::new(),
            feed: Arc::new(FeedClient::new(&cfg, latency.clone()).unwrap()),
            health: Arc::new(HealthState::new()),
            latency,
        };
        let base = spawn(router(state.clone())).await;
        (base, state)
    }

    #[tokio::test]
    async fn add_and_list_tokens() {
        let (base, _) = serve_api().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/tokens"))
            .json(&serde_json::json!({ "address": "0xABC", "chainId": "bsc" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["added"], true);

        let resp = client
            .post(format!("{base}/tokens"))
            .json(&serde_json::json!({ "address": "   " }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

        let body: serde_json::Value = client
            .get(format!("{base}/tokens"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["tokens"][0]["address"], "0xabc");
        assert_eq!(body["tokens"][0]["chainId"], "bsc");
    }

    #[tokio::test]
    async fn live_ticker_analyzes_and_caches() {
        let (base, state) = serve_api().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/market/ticker"))
            .json(&serde_json::json!({ "address": "0xAA" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["cached"], false);
        assert_eq!(body["data"]["address"], "0xaa");
        assert_eq!(body["data"]["analysis"]["score"], 100);
        assert_eq!(body["data"]["analysis"]["status"], "STABLE");
        assert_eq!(body["data"]["analysis"]["factors"]["volumeTrend"], "NORMAL");
        assert_eq!(body["data"]["record"]["baseToken"]["symbol"], "ALP");
        let buy = body["data"]["strategy"]["buyPrice"].as_f64().unwrap();
        assert!((buy - 2.02).abs() < 1e-9);

        assert!(state.store.get("0xaa").is_some());
        assert_eq!(state.latency.len(), 1);
    }

    #[tokio::test]
    async fn live_ticker_error_statuses() {
        let (base, _) = serve_api().await;
        let client = reqwest::Client::new();
        let post = |address: &'static str| {
            client
                .post(format!("{base}/market/ticker"))
                .json(&serde_json::json!({ "address": address }))
                .send()
        };

        assert_eq!(post("0xnone").await.unwrap().status(), reqwest::StatusCode::NOT_FOUND);
        assert_eq!(post("0xbad").await.unwrap().status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(post("").await.unwrap().status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn in_flight_lookup_serves_cache_or_conflict() {
        let (base, state) = serve_api().await;
        let client = reqwest::Client::new();

        let _guard = state.store.begin_fetch("0xaa").unwrap();
        let resp = client
            .post(format!("{base}/market/ticker"))
            .json(&serde_json::json!({ "address": "0xaa" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn tickers_follow_watch_list() {
        let (base, state) = serve_api().await;
        let client = reqwest::Client::new();

        watchlist::insert(&state.pool, "0xaa", None).await.unwrap();
        watchlist::insert(&state.pool, "0xnone", None).await.unwrap();
        client
            .post(format!("{base}/market/ticker"))
            .json(&serde_json::json!({ "address": "0xaa" }))
            .send()
            .await
            .unwrap();

        let body: serde_json::Value = client
            .get(format!("{base}/market/tickers"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["address"], "0xaa");
        assert_eq!(body["missing"], serde_json::json!(["0xnone"]));

        let health: serde_json::Value = client
            .get(format!("{base}/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["tokensTracked"], 1);

        let latency: serde_json::Value = client
            .get(format!("{base}/stats/latency"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(latency["samples"], 1);
        assert!(latency["p99Ms"].as_f64().is_some());
    }
}
